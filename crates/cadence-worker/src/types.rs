//! Shared shapes flowing between discovery, execution, and the orchestrator.

use chrono::{DateTime, Utc};
use cadence_store::{MaterializationWindow, StoredRecurrenceRule};
use uuid::Uuid;

/// One unit of executable work: materialize one template event's instances
/// over a window. Stateless and disposable.
#[derive(Debug, Clone)]
pub struct MaterializationJob {
    pub organization_id: Uuid,
    pub base_recurring_event_id: Uuid,
    pub window_start_date: DateTime<Utc>,
    pub window_end_date: DateTime<Utc>,
}

/// A recurring template as seen by discovery, with scheduling metadata.
#[derive(Debug, Clone)]
pub struct RecurringEventInfo {
    pub event_id: Uuid,
    pub event_name: String,
    pub is_never_ending: bool,
    /// Coarse instance estimate, for duration weighting only.
    pub estimated_instances: u32,
    pub rule: StoredRecurrenceRule,
}

/// Everything one organization needs materialized, plus its scheduling
/// weight.
#[derive(Debug, Clone)]
pub struct DiscoveredWorkload {
    pub organization_id: Uuid,
    pub window: MaterializationWindow,
    pub recurring_events: Vec<RecurringEventInfo>,
    pub priority: f64,
    pub estimated_duration_ms: u64,
}

/// The result of executing one job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: MaterializationJob,
    pub success: bool,
    pub instances_created: u32,
    pub execution_time_ms: u64,
    /// Instances per second of execution time; 0 when nothing was created
    /// or the job failed.
    pub processing_throughput: f64,
    pub error: Option<String>,
}

/// Aggregate result of one batch of jobs.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// True only when every job in the batch succeeded.
    pub success: bool,
    pub outcomes: Vec<JobOutcome>,
    pub total_instances_created: u64,
    /// Concatenated per-job error messages, when any job failed.
    pub error_message: Option<String>,
}

impl BatchResult {
    /// Number of failed jobs in the batch.
    #[must_use]
    pub fn errors_encountered(&self) -> u32 {
        u32::try_from(self.outcomes.iter().filter(|o| !o.success).count()).unwrap_or(u32::MAX)
    }
}

/// Bookkeeping performed after a batch settles.
#[derive(Debug, Clone, Default)]
pub struct PostProcessingResult {
    pub instances_deleted: u64,
    /// Post-processing failures are advisory and never fail the run.
    pub errors: Vec<String>,
}

/// Summary of one full worker run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerResult {
    pub organizations_processed: u32,
    pub events_processed: u32,
    pub instances_created: u64,
    pub windows_updated: u32,
    pub errors_encountered: u32,
    pub processing_time_ms: u64,
}

/// Summary of one retention cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
    pub organizations_processed: u32,
    pub instances_deleted: u64,
    pub errors_encountered: u32,
    pub processing_time_ms: u64,
}
