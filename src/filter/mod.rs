//! Statement translator: condition/data mappings to parameterized SQL.

pub mod builder;
pub mod error;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use builder::{
    build_count, build_delete, build_insert, build_insert_ignore, build_insert_with,
    build_replace_insert, build_select, build_update, InsertMode,
};
pub use error::FilterError;
pub use types::*;
