//! Process startup: configuration, logging, signing keys and the MySQL gateway.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sqlx::MySqlPool;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::auth::JwtKeys;
use crate::config::{AppConfig, Environment, LogConfig};
use crate::database::{manager, Gateway, PoolHandle};

const LOG_PREFIX: &str = "ginger";
const LOG_SUFFIX: &str = "log";

#[derive(Debug, Parser)]
#[command(name = "ginger")]
#[command(about = "Ginger - backend service with a generic MySQL CRUD gateway")]
#[command(version)]
pub struct Cli {
    #[arg(default_value = "./config", help = "Config root holding one directory per environment")]
    pub config: PathBuf,

    #[arg(long, help = "Environment name, overrides APP_ENV (debug, test, release)")]
    pub env: Option<String>,
}

impl Cli {
    pub fn environment(&self) -> Environment {
        match &self.env {
            Some(name) => Environment::parse(name),
            None => Environment::from_env(),
        }
    }
}

pub struct App {
    pub config: AppConfig,
    pub gateway: Gateway<MySqlPool>,
    pub jwt: JwtKeys,
}

/// Load everything the server needs. Fails fast on any missing piece.
pub async fn boot(cli: &Cli) -> anyhow::Result<App> {
    let environment = cli.environment();
    let config = AppConfig::load(&cli.config, environment)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    init_logging(&config.log)?;
    tracing::info!(
        env = environment.as_str(),
        dir = %cli.config.display(),
        "configuration loaded"
    );

    let jwt = JwtKeys::from_env(config.base.jwt_expiry_hours).context("JWT_SECRET must be set")?;

    let pool = manager::connect(&config.mysql)
        .await
        .context("connecting to MySQL")?;
    let gateway = Gateway::new(PoolHandle::Ready(pool));

    Ok(App { config, gateway, jwt })
}

/// `RUST_LOG` wins over the configured level. With `logDir` set, output goes
/// to rolling `ginger.*.log` files in that directory without ANSI colours.
pub fn init_logging(log: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log.level))?;

    let result = match &log.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| format!("creating log dir {}", dir.display()))?;
            let (rotation, keep) = rolling_policy(log);
            let mut builder = RollingFileAppender::builder()
                .rotation(rotation)
                .filename_prefix(LOG_PREFIX)
                .filename_suffix(LOG_SUFFIX);
            if let Some(files) = keep {
                builder = builder.max_log_files(files);
            }
            let appender = builder
                .build(dir)
                .with_context(|| format!("opening log files in {}", dir.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(appender)
                .try_init()
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    // A subscriber may already be installed (tests); keep it.
    if let Err(e) = result {
        tracing::debug!("logging already initialised: {}", e);
    }
    Ok(())
}

/// Map `withRotationTime` (hours) and `maxDayCount` (days) onto the appender.
/// Sub-day periods rotate hourly, longer ones daily; retention is counted in
/// files, so it scales with the number of files written per day.
fn rolling_policy(log: &LogConfig) -> (Rotation, Option<usize>) {
    let (rotation, files_per_day) = match log.with_rotation_time {
        0 => return (Rotation::NEVER, None),
        1..=23 => (Rotation::HOURLY, 24),
        _ => (Rotation::DAILY, 1),
    };
    let keep = match log.max_day_count {
        0 => None,
        days => Some(days as usize * files_per_day),
    };
    (rotation, keep)
}
