//! The seam between the gateway and the connection pool.
//!
//! The gateway only needs two calls from a pool: run a query and get rows
//! back as column-keyed JSON maps, or run a statement and get the insert id
//! and affected-row count. `MySqlPool` implements both; tests swap in a fake.

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::types::BigDecimal;
use sqlx::{Column, MySql, MySqlPool, Row};

use crate::filter::SqlValue;

/// One result row keyed by column name.
pub type RowMap = Map<String, Value>;

/// What a write statement reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub last_insert_id: u64,
    pub rows_affected: u64,
}

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a row-returning statement.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowMap>, sqlx::Error>;

    /// Run a write statement.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, sqlx::Error>;
}

#[async_trait]
impl SqlExecutor for MySqlPool {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<RowMap>, sqlx::Error> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(self).await?;
        rows.iter().map(row_to_map).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, sqlx::Error> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_param(q, p);
        }
        let result = q.execute(self).await?;
        Ok(ExecOutcome {
            last_insert_id: result.last_insert_id(),
            rows_affected: result.rows_affected(),
        })
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, MySql, MySqlArguments>,
    v: &SqlValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match v {
        SqlValue::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::UInt(u) => q.bind(*u),
        SqlValue::Float(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.clone()),
    }
}

fn row_to_map(row: &MySqlRow) -> Result<RowMap, sqlx::Error> {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_value(row, i)?);
    }
    Ok(map)
}

// Same shapes chrono's serde impls read back, so rows materialize into
// `NaiveDateTime`/`NaiveDate`/`NaiveTime` fields.
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Decode one column by trying the Rust types MySQL columns map onto.
/// NULL decodes as `None` under any of them.
fn column_value(row: &MySqlRow, i: usize) -> Result<Value, sqlx::Error> {
    fn or_null<T>(v: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
        v.map(f).unwrap_or(Value::Null)
    }

    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return Ok(or_null(v, Value::from));
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(i) {
        return Ok(or_null(v, Value::from));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return Ok(or_null(v, |f| Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(i) {
        return Ok(or_null(v, |f| {
            Number::from_f64(f as f64).map(Value::Number).unwrap_or(Value::Null)
        }));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(i) {
        return Ok(or_null(v, |dt| Value::String(dt.format(DATETIME_FORMAT).to_string())));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(i) {
        return Ok(or_null(v, |d| Value::String(d.format(DATE_FORMAT).to_string())));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(i) {
        return Ok(or_null(v, |t| Value::String(t.format(TIME_FORMAT).to_string())));
    }
    if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(i) {
        return Ok(or_null(v, |d| Value::String(d.to_string())));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return Ok(or_null(v, Value::String));
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(i) {
        return Ok(v.unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return Ok(or_null(v, |b| Value::String(String::from_utf8_lossy(&b).into_owned())));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return Ok(or_null(v, Value::Bool));
    }

    Err(sqlx::Error::ColumnDecode {
        index: row.column(i).name().to_string(),
        source: format!("unsupported column type {:?}", row.column(i).type_info()).into(),
    })
}
