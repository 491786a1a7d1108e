use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcfError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Divergent terminal value: discount rate ({discount_rate}) must exceed terminal growth rate ({terminal_growth_rate})")]
    DivergentTerminalValue {
        discount_rate: Decimal,
        terminal_growth_rate: Decimal,
    },

    #[error("Undefined sensitivity cell: discount rate {discount_rate} equals terminal growth rate {terminal_growth_rate}")]
    UndefinedGridCell {
        discount_rate: Decimal,
        terminal_growth_rate: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DcfError {
    fn from(e: serde_json::Error) -> Self {
        DcfError::SerializationError(e.to_string())
    }
}
