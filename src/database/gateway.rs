//! Generic CRUD over condition mappings.
//!
//! Each operation translates its mappings into one statement, runs it once
//! against the pool and hands back rows, an id or a count. The gateway keeps
//! no state besides the pool handle and never retries.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::database::executor::{RowMap, SqlExecutor};
use crate::database::manager::{DatabaseError, PoolHandle};
use crate::database::models::HasTableName;
use crate::filter::{self, FilterWhereOptions};

#[derive(Debug, Clone, Default)]
pub struct Gateway<E> {
    handle: PoolHandle<E>,
}

impl<E: SqlExecutor> Gateway<E> {
    pub fn new(handle: PoolHandle<E>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &PoolHandle<E> {
        &self.handle
    }

    /// Populate `dest` from the first matching row. `dest` is left untouched
    /// when nothing matches; columns not selected keep their current values.
    pub async fn fetch_one<T>(
        &self,
        table: &str,
        conditions: &Value,
        columns: &[&str],
        dest: &mut T,
    ) -> Result<(), DatabaseError>
    where
        T: Serialize + DeserializeOwned,
    {
        let executor = self.handle.get()?;
        let sql = filter::build_select(table, conditions, columns)?;
        let rows = executor.query(&sql.query, &sql.params).await?;
        if let Some(row) = rows.into_iter().next() {
            populate(dest, row)?;
        }
        Ok(())
    }

    /// Replace `dest` with every matching row, in the order the store returned them.
    pub async fn fetch_many<T>(
        &self,
        table: &str,
        conditions: &Value,
        columns: &[&str],
        dest: &mut Vec<T>,
    ) -> Result<(), DatabaseError>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let executor = self.handle.get()?;
        let sql = filter::build_select(table, conditions, columns)?;
        let rows = executor.query(&sql.query, &sql.params).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let mut item = T::default();
            populate(&mut item, row)?;
            items.push(item);
        }
        *dest = items;
        Ok(())
    }

    /// [`fetch_one`](Self::fetch_one) against `T`'s own table. An empty
    /// column list selects `T::COLUMNS`.
    pub async fn fetch_one_of<T>(
        &self,
        conditions: &Value,
        columns: &[&str],
        dest: &mut T,
    ) -> Result<(), DatabaseError>
    where
        T: HasTableName + Serialize + DeserializeOwned,
    {
        let columns = if columns.is_empty() { T::COLUMNS } else { columns };
        self.fetch_one(T::table_name(), conditions, columns, dest).await
    }

    /// [`fetch_many`](Self::fetch_many) against `T`'s own table.
    pub async fn fetch_many_of<T>(
        &self,
        conditions: &Value,
        columns: &[&str],
        dest: &mut Vec<T>,
    ) -> Result<(), DatabaseError>
    where
        T: HasTableName + Default + Serialize + DeserializeOwned,
    {
        let columns = if columns.is_empty() { T::COLUMNS } else { columns };
        self.fetch_many(T::table_name(), conditions, columns, dest).await
    }

    /// Insert one or more rows; returns the insert id MySQL reports.
    pub async fn insert(&self, table: &str, rows: &[Value]) -> Result<u64, DatabaseError> {
        let executor = self.handle.get()?;
        let sql = filter::build_insert(table, rows)?;
        let outcome = executor.execute(&sql.query, &sql.params).await?;
        Ok(outcome.last_insert_id)
    }

    /// `INSERT IGNORE`. `None` when every row was dropped as a duplicate.
    pub async fn insert_ignore(&self, table: &str, rows: &[Value]) -> Result<Option<u64>, DatabaseError> {
        let executor = self.handle.get()?;
        let sql = filter::build_insert_ignore(table, rows)?;
        let outcome = executor.execute(&sql.query, &sql.params).await?;
        if outcome.rows_affected == 0 {
            return Ok(None);
        }
        Ok(Some(outcome.last_insert_id))
    }

    /// `REPLACE INTO`; returns the id of the inserted or replacing row.
    pub async fn insert_replace(&self, table: &str, rows: &[Value]) -> Result<u64, DatabaseError> {
        let executor = self.handle.get()?;
        let sql = filter::build_replace_insert(table, rows)?;
        let outcome = executor.execute(&sql.query, &sql.params).await?;
        Ok(outcome.last_insert_id)
    }

    /// Returns the number of affected rows. Empty conditions are rejected;
    /// use [`update_all`](Self::update_all) to touch every row.
    pub async fn update(&self, table: &str, conditions: &Value, data: &Value) -> Result<u64, DatabaseError> {
        self.run_update(table, conditions, data, &FilterWhereOptions::default())
            .await
    }

    pub async fn update_all(&self, table: &str, data: &Value) -> Result<u64, DatabaseError> {
        self.run_update(table, &Value::Null, data, &FilterWhereOptions::unconditional())
            .await
    }

    /// Returns the number of deleted rows. Empty conditions are rejected;
    /// use [`delete_all`](Self::delete_all) to empty the table.
    pub async fn delete(&self, table: &str, conditions: &Value) -> Result<u64, DatabaseError> {
        self.run_delete(table, conditions, &FilterWhereOptions::default()).await
    }

    pub async fn delete_all(&self, table: &str) -> Result<u64, DatabaseError> {
        self.run_delete(table, &Value::Null, &FilterWhereOptions::unconditional())
            .await
    }

    /// `COUNT(*)` of matching rows.
    pub async fn count(&self, table: &str, conditions: &Value) -> Result<i64, DatabaseError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: i64,
        }

        let executor = self.handle.get()?;
        let sql = filter::build_count(table, conditions)?;
        let rows = executor.query(&sql.query, &sql.params).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(serde_json::from_value::<CountRow>(Value::Object(row))?.count),
            None => Ok(0),
        }
    }

    /// Round-trip `SELECT 1`.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        let executor = self.handle.get()?;
        executor.query("SELECT 1", &[]).await?;
        Ok(())
    }

    async fn run_update(
        &self,
        table: &str,
        conditions: &Value,
        data: &Value,
        options: &FilterWhereOptions,
    ) -> Result<u64, DatabaseError> {
        let executor = self.handle.get()?;
        let sql = filter::build_update(table, conditions, data, options)?;
        let outcome = executor.execute(&sql.query, &sql.params).await?;
        Ok(outcome.rows_affected)
    }

    async fn run_delete(
        &self,
        table: &str,
        conditions: &Value,
        options: &FilterWhereOptions,
    ) -> Result<u64, DatabaseError> {
        let executor = self.handle.get()?;
        let sql = filter::build_delete(table, conditions, options)?;
        let outcome = executor.execute(&sql.query, &sql.params).await?;
        Ok(outcome.rows_affected)
    }
}

/// Overlay `row` onto the serialized form of `dest` and decode it back, so
/// column names resolve through the entity's serde field names.
fn populate<T>(dest: &mut T, row: RowMap) -> Result<(), serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = match serde_json::to_value(&*dest)? {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };
    merged.extend(row);
    *dest = serde_json::from_value(Value::Object(merged))?;
    Ok(())
}
