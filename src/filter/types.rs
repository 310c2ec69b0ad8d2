use serde_json::Value;

use super::error::FilterError;

/// Comparison operators accepted as condition key suffixes, e.g. `"age >="`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NIn,
    Like,
    NLike,
    Between,
    NBetween,
}

impl FilterOp {
    /// Parse the operator part of a condition key. Matching is case-insensitive
    /// and tolerant of repeated whitespace (`"not   in"`).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let normalized = suffix
            .split_whitespace()
            .map(|s| s.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        Some(match normalized.as_str() {
            "" | "=" => FilterOp::Eq,
            "!=" | "<>" => FilterOp::Ne,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Gte,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Lte,
            "in" => FilterOp::In,
            "not in" => FilterOp::NIn,
            "like" => FilterOp::Like,
            "not like" => FilterOp::NLike,
            "between" => FilterOp::Between,
            "not between" => FilterOp::NBetween,
            _ => return None,
        })
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
            FilterOp::NIn => "NOT IN",
            FilterOp::Like => "LIKE",
            FilterOp::NLike => "NOT LIKE",
            FilterOp::Between => "BETWEEN",
            FilterOp::NBetween => "NOT BETWEEN",
        }
    }
}

/// Operand bound to a `?` placeholder. Everything that reaches the driver
/// is one of these; JSON objects and nested arrays never get this far.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Narrow a scalar JSON value. `column` only feeds the error message.
    pub fn from_json(column: &str, v: &Value) -> Result<Self, FilterError> {
        Ok(match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::UInt(u)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::Float(f)
                } else {
                    return Err(FilterError::UnsupportedOperand(column.to_string()));
                }
            }
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => {
                return Err(FilterError::UnsupportedOperand(column.to_string()))
            }
        })
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

/// Per-statement switches for the WHERE builder.
#[derive(Debug, Clone, Default)]
pub struct FilterWhereOptions {
    /// Let UPDATE/DELETE run with no conditions at all.
    pub allow_unconditional: bool,
}

impl FilterWhereOptions {
    pub fn unconditional() -> Self {
        Self { allow_unconditional: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// `LIMIT n` or MySQL's `LIMIT offset, n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterLimit {
    pub offset: Option<u64>,
    pub count: u64,
}

impl FilterLimit {
    pub fn to_sql(&self) -> String {
        match self.offset {
            Some(offset) => format!("LIMIT {}, {}", offset, self.count),
            None => format!("LIMIT {}", self.count),
        }
    }
}

/// Statement text plus positional arguments, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlValue>,
}
