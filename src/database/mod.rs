pub mod executor;
pub mod gateway;
pub mod manager;
pub mod models;

pub use executor::{ExecOutcome, RowMap, SqlExecutor};
pub use gateway::Gateway;
pub use manager::{DatabaseError, PoolHandle};
pub use models::HasTableName;
