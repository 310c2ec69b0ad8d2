//! YAML configuration, one file per concern under `<root>/<env>/`.
//!
//! `base.yaml`, `log.yaml` and `mysql.yaml` are required; `redis.yaml` and
//! `mongodb.yaml` fall back to defaults when absent. Environment variables
//! override a handful of values after the files are read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory {0} does not exist")]
    MissingDir(PathBuf),

    #[error("no config files found in {0}")]
    EmptyDir(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Deployment flavour; also the name of the config subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Debug,
    Test,
    Release,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::parse(env::var("APP_ENV").as_deref().unwrap_or(""))
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "release" | "production" | "prod" => Environment::Release,
            "test" | "staging" | "stage" => Environment::Test,
            _ => Environment::Debug,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Debug => "debug",
            Environment::Test => "test",
            Environment::Release => "release",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseConfig {
    pub env: String,
    pub listen: u16,
    pub jwt_expiry_hours: u64,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            env: Environment::Debug.as_str().to_string(),
            listen: 8080,
            jwt_expiry_hours: 24 * 7, // 1 week
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    /// When set, logs go to rolling files under this directory instead of stdout.
    pub log_dir: Option<PathBuf>,
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Days of log files to keep; 0 keeps everything.
    pub max_day_count: u32,
    /// Hours between file rotations; 0 writes a single file.
    pub with_rotation_time: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            level: "info".to_string(),
            max_day_count: 7,
            with_rotation_time: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MysqlConfig {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_passwd: String,
    pub db_name: String,
    /// Seconds; 0 keeps connections indefinitely.
    pub conn_max_lifetime: u64,
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub charset: String,
    /// Acquire timeout in seconds.
    pub timeout: u64,
    /// Connect eagerly at startup and verify with `SELECT 1`.
    pub ping: bool,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            db_host: "127.0.0.1".to_string(),
            db_port: 3306,
            db_user: "root".to_string(),
            db_passwd: String::new(),
            db_name: String::new(),
            conn_max_lifetime: 0,
            max_idle_conns: 2,
            max_open_conns: 10,
            charset: "utf8mb4".to_string(),
            timeout: 30,
            ping: false,
        }
    }
}

impl MysqlConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .password(&self.db_passwd)
            .charset(&self.charset);
        if self.db_name.is_empty() {
            options
        } else {
            options.database(&self.db_name)
        }
    }

    pub fn pool_options(&self) -> MySqlPoolOptions {
        let max_open = self.max_open_conns.max(1);
        let max_lifetime = match self.conn_max_lifetime {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        MySqlPoolOptions::new()
            .max_connections(max_open)
            .min_connections(self.max_idle_conns.min(max_open))
            .acquire_timeout(Duration::from_secs(self.timeout))
            .max_lifetime(max_lifetime)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedisConfig {
    pub db_host: String,
    pub db_port: u16,
    pub db_auth: bool,
    pub db_passwd: String,
    pub max_active: u32,
    pub max_idle: u32,
    /// Seconds.
    pub idle_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            db_host: "127.0.0.1".to_string(),
            db_port: 6379,
            db_auth: false,
            db_passwd: String::new(),
            max_active: 0,
            max_idle: 8,
            idle_timeout: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MongoConfig {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_passwd: String,
    pub db_name: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            db_host: "127.0.0.1".to_string(),
            db_port: 27017,
            db_user: String::new(),
            db_passwd: String::new(),
            db_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub base: BaseConfig,
    pub log: LogConfig,
    pub mysql: MysqlConfig,
    pub redis: RedisConfig,
    pub mongodb: MongoConfig,
}

impl AppConfig {
    /// `<root>/<env>/`, which must exist and hold at least one entry.
    pub fn resolve_dir(root: &Path, environment: Environment) -> Result<PathBuf, ConfigError> {
        let dir = root.join(environment.as_str());
        let mut entries = fs::read_dir(&dir).map_err(|_| ConfigError::MissingDir(dir.clone()))?;
        if entries.next().is_none() {
            return Err(ConfigError::EmptyDir(dir));
        }
        Ok(dir)
    }

    /// Read every section from an already-resolved directory. No env overrides.
    pub fn load_dir(dir: &Path, environment: Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            environment,
            base: read_yaml(&dir.join("base.yaml"))?,
            log: read_yaml(&dir.join("log.yaml"))?,
            mysql: read_yaml(&dir.join("mysql.yaml"))?,
            redis: read_optional_yaml(&dir.join("redis.yaml"))?,
            mongodb: read_optional_yaml(&dir.join("mongodb.yaml"))?,
        })
    }

    /// Resolve `<root>/<env>/`, read it, then apply environment overrides.
    pub fn load(root: &Path, environment: Environment) -> Result<Self, ConfigError> {
        let dir = Self::resolve_dir(root, environment)?;
        Ok(Self::load_dir(&dir, environment)?.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("LISTEN_PORT") {
            self.base.listen = v.parse().unwrap_or(self.base.listen);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = lookup("MYSQL_HOST") {
            self.mysql.db_host = v;
        }
        if let Some(v) = lookup("MYSQL_PORT") {
            self.mysql.db_port = v.parse().unwrap_or(self.mysql.db_port);
        }
        if let Some(v) = lookup("MYSQL_USER") {
            self.mysql.db_user = v;
        }
        if let Some(v) = lookup("MYSQL_PASSWORD") {
            self.mysql.db_passwd = v;
        }
        if let Some(v) = lookup("MYSQL_DATABASE") {
            self.mysql.db_name = v;
        }
        self
    }
}

fn read_yaml<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional_yaml<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    if path.exists() {
        read_yaml(path)
    } else {
        Ok(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn environment_aliases() {
        assert_eq!(Environment::parse("production"), Environment::Release);
        assert_eq!(Environment::parse(" Release "), Environment::Release);
        assert_eq!(Environment::parse("staging"), Environment::Test);
        assert_eq!(Environment::parse(""), Environment::Debug);
        assert_eq!(Environment::parse("whatever"), Environment::Debug);
    }

    #[test]
    fn mysql_yaml_uses_camel_case_keys() {
        let cfg: MysqlConfig = serde_yaml::from_str(
            "dbHost: db.internal\ndbPort: 3307\ndbName: ginger_db\nmaxOpenConns: 20\nallowCleartextPasswords: true\n",
        )
        .unwrap();
        assert_eq!(cfg.db_host, "db.internal");
        assert_eq!(cfg.db_port, 3307);
        assert_eq!(cfg.db_name, "ginger_db");
        assert_eq!(cfg.max_open_conns, 20);
        // unset keys keep defaults
        assert_eq!(cfg.charset, "utf8mb4");
        // driver-specific keys with no sqlx counterpart are accepted and dropped
        let legacy: MysqlConfig = serde_yaml::from_str(
            "dbHost: db.internal\nreadTimeout: 30\ninterpolateParams: true\nparseTime: true\n",
        )
        .unwrap();
        assert_eq!(legacy.db_host, "db.internal");
        assert!(!cfg.ping);
    }

    #[test]
    fn log_yaml_carries_rotation_settings() {
        let cfg: LogConfig =
            serde_yaml::from_str("logDir: /var/log/ginger\nmaxDayCount: 30\nwithRotationTime: 1\n").unwrap();
        assert_eq!(cfg.log_dir, Some(PathBuf::from("/var/log/ginger")));
        assert_eq!(cfg.max_day_count, 30);
        assert_eq!(cfg.with_rotation_time, 1);
        assert_eq!(cfg.level, "info");
    }

    #[test]
    fn overrides_apply_after_files() {
        let vars: HashMap<&str, &str> = [
            ("MYSQL_HOST", "10.0.0.5"),
            ("MYSQL_PORT", "not-a-port"),
            ("LISTEN_PORT", "9090"),
        ]
        .into_iter()
        .collect();
        let cfg = AppConfig {
            environment: Environment::Debug,
            base: BaseConfig::default(),
            log: LogConfig::default(),
            mysql: MysqlConfig::default(),
            redis: RedisConfig::default(),
            mongodb: MongoConfig::default(),
        }
        .apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.mysql.db_host, "10.0.0.5");
        assert_eq!(cfg.mysql.db_port, 3306);
        assert_eq!(cfg.base.listen, 9090);
    }

    #[test]
    fn pool_options_clamp_idle_to_open() {
        let cfg = MysqlConfig {
            max_open_conns: 4,
            max_idle_conns: 16,
            ..MysqlConfig::default()
        };
        let opts = cfg.pool_options();
        assert_eq!(opts.get_max_connections(), 4);
        assert_eq!(opts.get_min_connections(), 4);
    }
}
