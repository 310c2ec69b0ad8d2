use serde_json::Value;

use super::builder::{quoted, validate_column};
use super::error::FilterError;
use super::types::{FilterLimit, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"created_at desc, name"` or `["created_at desc", "name asc"]`.
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    let s = v.as_str().ok_or_else(|| {
                        FilterError::InvalidOperatorData("_orderby entries must be strings".to_string())
                    })?;
                    out.extend(Self::parse_order_string(s)?);
                }
                Ok(out)
            }
            Value::Null => Ok(vec![]),
            _ => Err(FilterError::InvalidOperatorData(
                "_orderby must be a string or array of strings".to_string(),
            )),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(col) = it.next() else { continue };
            validate_column(col)?;
            let sort = match it.next() {
                None => SortDirection::Asc,
                Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                Some(d) => {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "unknown sort direction: {}",
                        d
                    )))
                }
            };
            if it.next().is_some() {
                return Err(FilterError::InvalidOperatorData(format!(
                    "malformed _orderby entry: {}",
                    trimmed
                )));
            }
            out.push(FilterOrderInfo { column: col.to_string(), sort });
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", quoted(&i.column), i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// `_limit` is either a row count or `[offset, count]`.
    pub fn parse_limit(limit: &Value) -> Result<FilterLimit, FilterError> {
        let as_count = |v: &Value| {
            v.as_u64()
                .ok_or_else(|| FilterError::InvalidLimit(format!("expected non-negative integer, got {}", v)))
        };
        match limit {
            Value::Number(_) => Ok(FilterLimit { offset: None, count: as_count(limit)? }),
            Value::Array(arr) if arr.len() == 1 => Ok(FilterLimit { offset: None, count: as_count(&arr[0])? }),
            Value::Array(arr) if arr.len() == 2 => Ok(FilterLimit {
                offset: Some(as_count(&arr[0])?),
                count: as_count(&arr[1])?,
            }),
            other => Err(FilterError::InvalidLimit(format!(
                "_limit must be a count or [offset, count], got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_order_string_with_defaults() {
        let infos = FilterOrder::validate_and_parse(&json!("create_at desc, name")).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].sort, SortDirection::Desc);
        assert_eq!(infos[1].sort, SortDirection::Asc);
        assert_eq!(
            FilterOrder::generate(&infos),
            "ORDER BY `create_at` DESC, `name` ASC"
        );
    }

    #[test]
    fn rejects_bad_direction() {
        assert!(FilterOrder::validate_and_parse(&json!("name sideways")).is_err());
        assert!(FilterOrder::validate_and_parse(&json!(42)).is_err());
    }

    #[test]
    fn limit_forms() {
        assert_eq!(FilterOrder::parse_limit(&json!(10)).unwrap().to_sql(), "LIMIT 10");
        assert_eq!(FilterOrder::parse_limit(&json!([20, 10])).unwrap().to_sql(), "LIMIT 20, 10");
        assert!(FilterOrder::parse_limit(&json!(-1)).is_err());
        assert!(FilterOrder::parse_limit(&json!("10")).is_err());
    }
}
