use thiserror::Error;

/// Worker pipeline errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Recurrence(#[from] cadence_recurrence::RecurrenceError),

    #[error(transparent)]
    Store(#[from] cadence_store::StoreError),
}
