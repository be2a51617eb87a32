use thiserror::Error;

/// Recurrence parsing and generation errors
#[derive(Error, Debug)]
pub enum RecurrenceError {
    #[error("RRULE missing FREQ")]
    MissingFrequency,

    #[error("Unsupported FREQ value: {0}")]
    UnsupportedFrequency(String),

    #[error("Invalid BYDAY token: {0}")]
    InvalidByDay(String),

    #[error("Invalid UNTIL value: {0}")]
    InvalidUntil(String),

    #[error("Invalid {field} value: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Recurrence interval must be >= 1")]
    IntervalOutOfRange,
}

pub type RecurrenceResult<T> = std::result::Result<T, RecurrenceError>;
