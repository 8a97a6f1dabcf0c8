use thiserror::Error;

#[derive(Debug, Error)]
pub enum GreenlinkError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Configuration error for KPI {kpi_id}: {reason}")]
    ConfigurationError { kpi_id: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for GreenlinkError {
    fn from(e: serde_json::Error) -> Self {
        GreenlinkError::SerializationError(e.to_string())
    }
}
