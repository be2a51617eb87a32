//! The background worker pipeline that keeps materialization windows fresh:
//! job discovery, bounded-concurrency execution, post-processing, and the
//! orchestrator tying them together.

pub mod cleanup;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod materialize;
pub mod pipeline;
pub mod post_process;
pub mod types;

pub use cleanup::run_retention_cleanup;
pub use discovery::{create_materialization_jobs, discover_workloads};
pub use engine::execute_batch;
pub use error::WorkerError;
pub use materialize::materialize_job;
pub use pipeline::{run_for_organization, run_worker};
pub use types::{
    BatchResult, CleanupResult, DiscoveredWorkload, JobOutcome, MaterializationJob,
    PostProcessingResult, RecurringEventInfo, WorkerResult,
};
