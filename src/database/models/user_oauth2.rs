use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::HasTableName;

pub const USER_OAUTH2_TABLE_NAME: &str = "user_oauth2";

/// Third-party login binding, one row of `user_oauth2`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserOauth2 {
    pub id: i64,
    pub platform: i8,
    pub access_token: String,
    pub open_id: String,
    pub union_id: String,
    #[serde(rename = "nick_name")]
    pub nickname: String,
    pub gender: i8,
    pub avatar_url: String,
    pub create_at: NaiveDateTime,
    pub update_at: NaiveDateTime,
}

impl HasTableName for UserOauth2 {
    const TABLE_NAME: &'static str = USER_OAUTH2_TABLE_NAME;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "platform",
        "access_token",
        "open_id",
        "union_id",
        "nick_name",
        "gender",
        "avatar_url",
        "create_at",
        "update_at",
    ];
}
