//! Builds parameterized MySQL statements from condition and data mappings.
//!
//! Identifiers are validated and backtick-quoted; every value travels as a
//! `?` argument. Nothing here touches a connection.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{FilterWhere, KEY_LIMIT, KEY_ORDER_BY};
use super::types::{FilterLimit, FilterWhereOptions, SqlResult, SqlValue};

/// Quote an identifier for MySQL.
pub(crate) fn quoted(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn validate_table_name(name: &str) -> Result<(), FilterError> {
    if name.is_empty() {
        return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string()));
    }
    if !is_identifier(name) {
        return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
    }
    Ok(())
}

pub(crate) fn validate_column(name: &str) -> Result<(), FilterError> {
    if name.is_empty() {
        return Err(FilterError::InvalidColumn("Column name cannot be empty".to_string()));
    }
    if !is_identifier(name) {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", name)));
    }
    Ok(())
}

#[derive(Default)]
struct Clauses {
    where_sql: String,
    params: Vec<SqlValue>,
    order_sql: String,
    limit: Option<FilterLimit>,
}

impl Clauses {
    fn from_conditions(conditions: &Value) -> Result<Self, FilterError> {
        let Some(map) = FilterWhere::validate(conditions)? else {
            return Ok(Self::default());
        };
        let (where_sql, params) = FilterWhere::generate(map)?;
        let order_sql = match map.get(KEY_ORDER_BY) {
            Some(v) => FilterOrder::generate(&FilterOrder::validate_and_parse(v)?),
            None => String::new(),
        };
        let limit = map.get(KEY_LIMIT).map(FilterOrder::parse_limit).transpose()?;
        Ok(Self { where_sql, params, order_sql, limit })
    }

    fn where_clause(&self) -> String {
        if self.where_sql.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.where_sql)
        }
    }

    fn limit_clause(&self) -> String {
        self.limit.map(|l| l.to_sql()).unwrap_or_default()
    }

    /// UPDATE and DELETE only take a plain row count.
    fn mutation_limit_clause(&self) -> Result<String, FilterError> {
        match self.limit {
            Some(FilterLimit { offset: Some(_), .. }) => Err(FilterError::InvalidLimit(
                "UPDATE/DELETE accept a row count, not an offset".to_string(),
            )),
            _ => Ok(self.limit_clause()),
        }
    }

    fn guard(&self, statement: &'static str, options: &FilterWhereOptions) -> Result<(), FilterError> {
        if self.where_sql.is_empty() && !options.allow_unconditional {
            return Err(FilterError::EmptyCondition(statement));
        }
        Ok(())
    }
}

fn assemble(parts: Vec<String>, params: Vec<SqlValue>) -> SqlResult {
    let query = parts
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(query = %query, params = params.len(), "built statement");
    SqlResult { query, params }
}

fn select_list(columns: &[&str]) -> Result<String, FilterError> {
    if columns.is_empty() || columns.contains(&"*") {
        return Ok("*".to_string());
    }
    for column in columns {
        validate_column(column)?;
    }
    Ok(columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", "))
}

/// `SELECT` with WHERE, optional `_orderby` and `_limit`. An empty column
/// list selects `*`.
pub fn build_select(table: &str, conditions: &Value, columns: &[&str]) -> Result<SqlResult, FilterError> {
    validate_table_name(table)?;
    let select = select_list(columns)?;
    let clauses = Clauses::from_conditions(conditions)?;
    Ok(assemble(
        vec![
            format!("SELECT {}", select),
            format!("FROM {}", quoted(table)),
            clauses.where_clause(),
            clauses.order_sql.clone(),
            clauses.limit_clause(),
        ],
        clauses.params,
    ))
}

/// `SELECT COUNT(*) AS count`. Ordering and limits do not apply to an
/// aggregate and are ignored.
pub fn build_count(table: &str, conditions: &Value) -> Result<SqlResult, FilterError> {
    validate_table_name(table)?;
    let clauses = Clauses::from_conditions(conditions)?;
    Ok(assemble(
        vec![
            format!("SELECT COUNT(*) AS {}", quoted("count")),
            format!("FROM {}", quoted(table)),
            clauses.where_clause(),
        ],
        clauses.params,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    Insert,
    Ignore,
    Replace,
}

impl InsertMode {
    fn verb(&self) -> &'static str {
        match self {
            InsertMode::Insert => "INSERT INTO",
            InsertMode::Ignore => "INSERT IGNORE INTO",
            InsertMode::Replace => "REPLACE INTO",
        }
    }
}

fn as_data_object<'a>(row: &'a Value, index: usize) -> Result<&'a Map<String, Value>, FilterError> {
    match row {
        Value::Object(obj) if !obj.is_empty() => Ok(obj),
        Value::Object(_) => Err(FilterError::InvalidData(format!("row {} has no columns", index))),
        _ => Err(FilterError::InvalidData(format!("row {} must be an object", index))),
    }
}

fn key_list(keys: &BTreeSet<&str>) -> String {
    keys.iter().copied().collect::<Vec<_>>().join(", ")
}

/// Multi-row insert. Every row must carry the same column set as the first.
pub fn build_insert_with(mode: InsertMode, table: &str, rows: &[Value]) -> Result<SqlResult, FilterError> {
    validate_table_name(table)?;
    let first = rows
        .first()
        .ok_or_else(|| FilterError::InvalidData("insert requires at least one row".to_string()))?;
    let first = as_data_object(first, 0)?;
    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    for column in &columns {
        validate_column(column)?;
    }
    let expected: BTreeSet<&str> = columns.iter().copied().collect();

    let mut params = Vec::with_capacity(rows.len() * columns.len());
    let mut tuples = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let obj = as_data_object(row, index)?;
        let found: BTreeSet<&str> = obj.keys().map(String::as_str).collect();
        if found != expected {
            return Err(FilterError::ShapeMismatch {
                row: index,
                expected: key_list(&expected),
                found: key_list(&found),
            });
        }
        for column in &columns {
            params.push(SqlValue::from_json(column, &obj[*column])?);
        }
        tuples.push(format!("({})", vec!["?"; columns.len()].join(", ")));
    }

    let column_list = columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
    Ok(assemble(
        vec![
            format!("{} {} ({})", mode.verb(), quoted(table), column_list),
            format!("VALUES {}", tuples.join(", ")),
        ],
        params,
    ))
}

pub fn build_insert(table: &str, rows: &[Value]) -> Result<SqlResult, FilterError> {
    build_insert_with(InsertMode::Insert, table, rows)
}

pub fn build_insert_ignore(table: &str, rows: &[Value]) -> Result<SqlResult, FilterError> {
    build_insert_with(InsertMode::Ignore, table, rows)
}

pub fn build_replace_insert(table: &str, rows: &[Value]) -> Result<SqlResult, FilterError> {
    build_insert_with(InsertMode::Replace, table, rows)
}

/// `UPDATE ... SET`. Refuses to run without conditions unless `options`
/// allow it.
pub fn build_update(
    table: &str,
    conditions: &Value,
    data: &Value,
    options: &FilterWhereOptions,
) -> Result<SqlResult, FilterError> {
    validate_table_name(table)?;
    let data = as_data_object(data, 0)?;
    let clauses = Clauses::from_conditions(conditions)?;
    clauses.guard("UPDATE", options)?;

    let mut params = Vec::with_capacity(data.len() + clauses.params.len());
    let mut sets = Vec::with_capacity(data.len());
    for (column, value) in data {
        validate_column(column)?;
        params.push(SqlValue::from_json(column, value)?);
        sets.push(format!("{} = ?", quoted(column)));
    }
    let limit = clauses.mutation_limit_clause()?;
    params.extend(clauses.params.iter().cloned());

    Ok(assemble(
        vec![
            format!("UPDATE {}", quoted(table)),
            format!("SET {}", sets.join(", ")),
            clauses.where_clause(),
            clauses.order_sql.clone(),
            limit,
        ],
        params,
    ))
}

/// `DELETE FROM`. Same empty-condition guard as [`build_update`].
pub fn build_delete(
    table: &str,
    conditions: &Value,
    options: &FilterWhereOptions,
) -> Result<SqlResult, FilterError> {
    validate_table_name(table)?;
    let clauses = Clauses::from_conditions(conditions)?;
    clauses.guard("DELETE", options)?;
    let limit = clauses.mutation_limit_clause()?;
    Ok(assemble(
        vec![
            format!("DELETE FROM {}", quoted(table)),
            clauses.where_clause(),
            clauses.order_sql.clone(),
            limit,
        ],
        clauses.params,
    ))
}
