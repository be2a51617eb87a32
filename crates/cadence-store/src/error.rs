use thiserror::Error;

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: uuid::Uuid },

    #[error("Stored recurrence rule is invalid: {0}")]
    InvalidRule(#[from] cadence_recurrence::RecurrenceError),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
