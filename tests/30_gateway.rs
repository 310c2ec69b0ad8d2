use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use ginger::database::models::User;
use ginger::database::{DatabaseError, ExecOutcome, Gateway, PoolHandle, RowMap, SqlExecutor};
use ginger::filter::SqlValue;
use serde_json::{json, Value};

/// Answers every query with the same rows and every write with the same
/// outcome, remembering the SQL it was given.
#[derive(Clone, Default)]
struct ScriptedExecutor {
    rows: Vec<RowMap>,
    outcome: ExecOutcome,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    fn rows(rows: Vec<Value>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter_map(|r| r.as_object().cloned())
                .collect(),
            ..Self::default()
        }
    }

    fn outcome(last_insert_id: u64, rows_affected: u64) -> Self {
        Self {
            outcome: ExecOutcome { last_insert_id, rows_affected },
            ..Self::default()
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlExecutor for ScriptedExecutor {
    async fn query(&self, sql: &str, _params: &[SqlValue]) -> Result<Vec<RowMap>, sqlx::Error> {
        self.seen.lock().unwrap().push(sql.to_string());
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &str, _params: &[SqlValue]) -> Result<ExecOutcome, sqlx::Error> {
        self.seen.lock().unwrap().push(sql.to_string());
        Ok(self.outcome)
    }
}

fn user_row(id: u64, name: &str) -> Value {
    json!({
        "age": 30,
        "avatar": "",
        "create_at": "2024-01-02T03:04:05",
        "email": format!("{name}@example.com"),
        "gender": 1,
        "id": id,
        "name": name,
        "password": "x",
        "phone": "",
        "salt": "s",
        "status": 1,
        "update_at": "2024-01-02T03:04:05",
    })
}

#[tokio::test]
async fn login_lookup_fills_the_user() -> Result<()> {
    let exec = ScriptedExecutor::rows(vec![user_row(7, "alice")]);
    let gw = Gateway::new(PoolHandle::Ready(exec.clone()));

    let mut user = User::default();
    gw.fetch_one_of(&json!({ "email": "alice@example.com", "status": 1 }), &[], &mut user)
        .await?;

    assert_eq!(user.id, 7);
    assert_eq!(user.name, "alice");
    assert_eq!(user.create_at.to_string(), "2024-01-02 03:04:05");
    assert!(exec.seen()[0].starts_with("SELECT `id`, `name`, `age`"));
    assert!(exec.seen()[0].ends_with("FROM `user` WHERE `email` = ? AND `status` = ?"));
    Ok(())
}

#[tokio::test]
async fn listing_replaces_previous_contents() -> Result<()> {
    let exec = ScriptedExecutor::rows(vec![user_row(1, "a"), user_row(2, "b")]);
    let gw = Gateway::new(PoolHandle::Ready(exec));

    let mut users = vec![User::default(); 5];
    gw.fetch_many_of(&json!({ "_limit": 2 }), &[], &mut users).await?;

    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn registration_flow_reports_ids() -> Result<()> {
    let gw = Gateway::new(PoolHandle::Ready(ScriptedExecutor::outcome(42, 1)));
    let id = gw
        .insert("user", &[json!({ "email": "new@example.com", "name": "new" })])
        .await?;
    assert_eq!(id, 42);

    let dup = Gateway::new(PoolHandle::Ready(ScriptedExecutor::outcome(0, 0)));
    let ignored = dup
        .insert_ignore("user", &[json!({ "email": "new@example.com", "name": "new" })])
        .await?;
    assert_eq!(ignored, None);
    Ok(())
}

#[tokio::test]
async fn count_reads_the_aliased_column() -> Result<()> {
    let gw = Gateway::new(PoolHandle::Ready(ScriptedExecutor::rows(vec![json!({ "count": 12 })])));
    assert_eq!(gw.count("user", &json!({ "status": 1 })).await?, 12);
    Ok(())
}

#[tokio::test]
async fn nothing_runs_before_the_pool_is_ready() {
    let gw: Gateway<ScriptedExecutor> = Gateway::new(PoolHandle::Uninitialized);
    assert!(matches!(
        gw.delete("user", &json!({ "id": 1 })).await,
        Err(DatabaseError::NotInitialized)
    ));
    assert!(matches!(gw.ping().await, Err(DatabaseError::NotInitialized)));
}
