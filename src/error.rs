use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Date error: {0}")]
    DateError(#[from] chrono::ParseError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Gateway error: {0}")]
    GatewayError(String),
    #[error("Payment {reference} not confirmed after {attempts} status checks")]
    Timeout { reference: String, attempts: u32 },
    #[error("A payment attempt is already in flight")]
    AttemptInFlight,
    #[error("Payment attempt was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PaymentError>;
