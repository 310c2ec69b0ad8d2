//! Table-mapping entities. Field names (or serde renames) are the persisted
//! column names; each type names its table through [`HasTableName`].

pub mod user;
pub mod user_oauth2;

pub use user::User;
pub use user_oauth2::UserOauth2;

/// Capability every mapped entity provides so one generic gateway can serve
/// any table.
pub trait HasTableName {
    /// Backing table.
    const TABLE_NAME: &'static str;

    /// Persisted columns in declaration order. Used when a scan derives its
    /// select list from the entity type.
    const COLUMNS: &'static [&'static str];

    fn table_name() -> &'static str {
        Self::TABLE_NAME
    }
}
