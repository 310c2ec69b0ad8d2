use sqlx::MySqlPool;
use thiserror::Error;
use tracing::info;

use crate::config::MysqlConfig;
use crate::filter::FilterError;

/// Errors surfaced by the CRUD gateway and pool bootstrap.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection handle is not initialized")]
    NotInitialized,

    #[error("Translation error: {0}")]
    Translation(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Materialization error: {0}")]
    Materialization(#[from] serde_json::Error),
}

/// The process-wide connection pool as held by the gateway. Starts out
/// `Uninitialized` until bootstrap hands over a connected pool.
#[derive(Debug, Clone)]
pub enum PoolHandle<P> {
    Uninitialized,
    Ready(P),
}

impl<P> PoolHandle<P> {
    pub fn get(&self) -> Result<&P, DatabaseError> {
        match self {
            PoolHandle::Ready(pool) => Ok(pool),
            PoolHandle::Uninitialized => Err(DatabaseError::NotInitialized),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PoolHandle::Ready(_))
    }
}

impl<P> Default for PoolHandle<P> {
    fn default() -> Self {
        PoolHandle::Uninitialized
    }
}

impl<P> From<P> for PoolHandle<P> {
    fn from(pool: P) -> Self {
        PoolHandle::Ready(pool)
    }
}

/// Build the MySQL pool from `mysql.yaml`. With `ping` set the pool connects
/// eagerly and round-trips `SELECT 1`; otherwise connections open on first use.
pub async fn connect(config: &MysqlConfig) -> Result<MySqlPool, DatabaseError> {
    let options = config.connect_options();
    let pool_options = config.pool_options();

    let pool = if config.ping {
        let pool = pool_options.connect_with(options).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        pool
    } else {
        pool_options.connect_lazy_with(options)
    };

    info!(
        host = %config.db_host,
        port = config.db_port,
        database = %config.db_name,
        max_open = config.max_open_conns,
        eager = config.ping,
        "Created MySQL pool"
    );
    Ok(pool)
}

/// Close the pool, waiting for checked-out connections to return.
pub async fn close(pool: &MySqlPool) {
    pool.close().await;
    info!("Closed MySQL pool");
}
