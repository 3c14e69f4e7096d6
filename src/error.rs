use thiserror::Error;

pub type Result<T> = std::result::Result<T, PayoutError>;

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("invalid {kind} transition: {from} -> {to}")]
    InvalidTransition {
        kind: &'static str,
        from: String,
        to: String,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}
