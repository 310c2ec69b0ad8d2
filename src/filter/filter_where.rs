use serde_json::{Map, Value};

use super::builder::{quoted, validate_column};
use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, SqlValue};

/// Disjunction of nested condition objects: `{"_or": [{..}, {..}]}`.
pub const KEY_OR: &str = "_or";
/// Ordering spec, consumed by the statement builder.
pub const KEY_ORDER_BY: &str = "_orderby";
/// Row limit, consumed by the statement builder.
pub const KEY_LIMIT: &str = "_limit";

/// Renders a condition mapping into a WHERE body with `?` placeholders.
///
/// Keys are column names with an optional operator suffix separated by
/// whitespace (`"age >="`, `"id not in"`); a bare column means equality.
/// Conditions are ANDed together in key order.
pub struct FilterWhere {
    param_values: Vec<SqlValue>,
    conditions: Vec<String>,
}

impl FilterWhere {
    fn new() -> Self {
        Self {
            param_values: vec![],
            conditions: vec![],
        }
    }

    /// Returns the WHERE body (no keyword) and its arguments. The body is
    /// empty when the mapping holds no conditions.
    pub fn generate(where_data: &Map<String, Value>) -> Result<(String, Vec<SqlValue>), FilterError> {
        let mut filter_where = Self::new();
        filter_where.parse_where_data(where_data)?;
        Ok((filter_where.conditions.join(" AND "), filter_where.param_values))
    }

    /// Accepts `null` (no conditions) or an object.
    pub fn validate(where_data: &Value) -> Result<Option<&Map<String, Value>>, FilterError> {
        match where_data {
            Value::Null => Ok(None),
            Value::Object(obj) => Ok(Some(obj)),
            _ => Err(FilterError::InvalidWhereClause(
                "conditions must be an object".to_string(),
            )),
        }
    }

    fn parse_where_data(&mut self, where_data: &Map<String, Value>) -> Result<(), FilterError> {
        for (key, value) in where_data {
            match key.as_str() {
                KEY_OR => self.parse_or(value)?,
                KEY_ORDER_BY | KEY_LIMIT => continue,
                k if k.starts_with('_') => {
                    return Err(FilterError::UnsupportedOperator(key.clone()))
                }
                _ => {
                    let info = Self::parse_field_condition(key, value)?;
                    let sql = self.build_sql_condition(&info)?;
                    self.conditions.push(sql);
                }
            }
        }
        Ok(())
    }

    fn parse_or(&mut self, value: &Value) -> Result<(), FilterError> {
        let branches = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", KEY_OR)))?;

        let mut sql_parts = Vec::new();
        for branch in branches {
            let obj = branch.as_object().ok_or_else(|| {
                FilterError::InvalidOperatorData(format!("{} entries must be objects", KEY_OR))
            })?;
            if obj.contains_key(KEY_ORDER_BY) || obj.contains_key(KEY_LIMIT) {
                return Err(FilterError::InvalidOperatorData(format!(
                    "{} entries cannot carry {} or {}",
                    KEY_OR, KEY_ORDER_BY, KEY_LIMIT
                )));
            }
            let (sql, params) = Self::generate(obj)?;
            if sql.is_empty() {
                continue;
            }
            self.param_values.extend(params);
            sql_parts.push(format!("({})", sql));
        }

        if !sql_parts.is_empty() {
            self.conditions.push(format!("({})", sql_parts.join(" OR ")));
        }
        Ok(())
    }

    fn parse_field_condition(key: &str, value: &Value) -> Result<FilterWhereInfo, FilterError> {
        let key = key.trim();
        let (column, suffix) = key
            .split_once(char::is_whitespace)
            .unwrap_or((key, ""));
        validate_column(column)?;
        let operator = FilterOp::from_suffix(suffix)
            .ok_or_else(|| FilterError::UnsupportedOperator(key.to_string()))?;
        Ok(FilterWhereInfo {
            column: column.to_string(),
            operator,
            data: value.clone(),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = quoted(&condition.column);
        let op = condition.operator;
        match op {
            FilterOp::Eq if condition.data.is_null() => Ok(format!("{} IS NULL", column)),
            FilterOp::Ne if condition.data.is_null() => Ok(format!("{} IS NOT NULL", column)),
            FilterOp::Eq
            | FilterOp::Ne
            | FilterOp::Gt
            | FilterOp::Gte
            | FilterOp::Lt
            | FilterOp::Lte
            | FilterOp::Like
            | FilterOp::NLike => {
                let ph = self.param(&condition.column, &condition.data)?;
                Ok(format!("{} {} {}", column, op.to_sql(), ph))
            }
            FilterOp::In | FilterOp::NIn => {
                let values = match &condition.data {
                    Value::Array(values) => values.clone(),
                    scalar => vec![scalar.clone()],
                };
                if values.is_empty() {
                    // `NOT IN ()` would match every row and slip past the mutation guard
                    return Err(FilterError::InvalidOperatorData(format!(
                        "{} on {} requires at least one value",
                        op.to_sql(),
                        condition.column
                    )));
                }
                let mut placeholders = Vec::with_capacity(values.len());
                for v in &values {
                    placeholders.push(self.param(&condition.column, v)?);
                }
                Ok(format!("{} {} ({})", column, op.to_sql(), placeholders.join(", ")))
            }
            FilterOp::Between | FilterOp::NBetween => match &condition.data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(&condition.column, &values[0])?;
                    let high = self.param(&condition.column, &values[1])?;
                    Ok(format!("{} {} {} AND {}", column, op.to_sql(), low, high))
                }
                _ => Err(FilterError::InvalidOperatorData(format!(
                    "{} on {} requires exactly 2 values",
                    op.to_sql(),
                    condition.column
                ))),
            },
        }
    }

    fn param(&mut self, column: &str, value: &Value) -> Result<&'static str, FilterError> {
        self.param_values.push(SqlValue::from_json(column, value)?);
        Ok("?")
    }
}
