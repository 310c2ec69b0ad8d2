use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid WHERE clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Unsupported operand type for column {0}")]
    UnsupportedOperand(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Row {row} has columns [{found}], expected [{expected}]")]
    ShapeMismatch {
        row: usize,
        expected: String,
        found: String,
    },

    #[error("Refusing {0} without conditions")]
    EmptyCondition(&'static str),
}
