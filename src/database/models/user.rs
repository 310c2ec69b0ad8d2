use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::HasTableName;

pub const USER_TABLE_NAME: &str = "user";

/// Row of the `user` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub age: u8,
    pub avatar: String,
    pub gender: i8,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub salt: String,
    pub status: i8,
    pub update_at: NaiveDateTime,
    pub create_at: NaiveDateTime,
}

impl HasTableName for User {
    const TABLE_NAME: &'static str = USER_TABLE_NAME;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "age",
        "avatar",
        "gender",
        "email",
        "phone",
        "password",
        "salt",
        "status",
        "update_at",
        "create_at",
    ];
}
