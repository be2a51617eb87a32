//! The worker orchestrator: discovery, execution, post-processing, summary.
//!
//! The pipeline is linear. Zero discovered work short-circuits to a
//! zero-valued result, and any unhandled error is converted into a result
//! with one error recorded; a worker run never takes down the host.

use std::time::Instant;

use chrono::Utc;
use cadence_core::config::WorkerSettings;
use cadence_recurrence::GeneratorLimits;
use cadence_store::MaterializationStore;
use uuid::Uuid;

use crate::discovery::{
    create_materialization_jobs, discover_organization_workload, discover_workloads,
};
use crate::engine::execute_batch;
use crate::error::WorkerError;
use crate::post_process::{run_post_processing, update_windows};
use crate::types::{DiscoveredWorkload, WorkerResult};

/// ## Summary
/// Runs one full materialization pass: discover stale windows, execute jobs
/// with bounded concurrency, advance window frontiers, and optionally run
/// post-processing. Always returns a summary, even on total failure.
#[tracing::instrument(skip(store, settings, limits))]
pub async fn run_worker<S: MaterializationStore>(
    store: &S,
    settings: &WorkerSettings,
    limits: GeneratorLimits,
) -> WorkerResult {
    let started = Instant::now();
    tracing::info!("Starting materialization worker run");

    let mut result = match run_pipeline(store, settings, limits).await {
        Ok(result) => result,
        Err(error) => {
            tracing::error!(%error, "Materialization worker run failed");
            WorkerResult {
                errors_encountered: 1,
                ..WorkerResult::default()
            }
        }
    };
    result.processing_time_ms = elapsed_ms(started);

    tracing::info!(
        organizations = result.organizations_processed,
        events = result.events_processed,
        instances_created = result.instances_created,
        windows_updated = result.windows_updated,
        errors = result.errors_encountered,
        processing_time_ms = result.processing_time_ms,
        "Materialization worker run complete"
    );
    result
}

/// ## Summary
/// On-demand variant of [`run_worker`] scoped to one organization,
/// bypassing the staleness and cooldown filters. Same error boundary: a
/// failure becomes a summary with one error, never a crash.
#[tracing::instrument(skip(store, settings, limits), fields(%organization_id))]
pub async fn run_for_organization<S: MaterializationStore>(
    store: &S,
    settings: &WorkerSettings,
    limits: GeneratorLimits,
    organization_id: Uuid,
) -> WorkerResult {
    let started = Instant::now();

    let workload = match discover_organization_workload(store, organization_id, settings, Utc::now())
        .await
    {
        Ok(Some(workload)) => workload,
        Ok(None) => {
            tracing::info!("Organization has no recurring templates to materialize");
            return WorkerResult {
                processing_time_ms: elapsed_ms(started),
                ..WorkerResult::default()
            };
        }
        Err(error) => {
            tracing::error!(%error, "On-demand materialization failed during discovery");
            return WorkerResult {
                errors_encountered: 1,
                processing_time_ms: elapsed_ms(started),
                ..WorkerResult::default()
            };
        }
    };

    let mut result = materialize_workloads(store, settings, limits, &[workload]).await;
    result.processing_time_ms = elapsed_ms(started);
    result
}

async fn run_pipeline<S: MaterializationStore>(
    store: &S,
    settings: &WorkerSettings,
    limits: GeneratorLimits,
) -> Result<WorkerResult, WorkerError> {
    let workloads = discover_workloads(store, settings, Utc::now()).await?;
    if workloads.is_empty() {
        tracing::info!("No materialization work discovered");
        return Ok(WorkerResult::default());
    }

    Ok(materialize_workloads(store, settings, limits, &workloads).await)
}

async fn materialize_workloads<S: MaterializationStore>(
    store: &S,
    settings: &WorkerSettings,
    limits: GeneratorLimits,
    workloads: &[DiscoveredWorkload],
) -> WorkerResult {
    let now = Utc::now();
    let jobs = create_materialization_jobs(workloads, now);
    tracing::info!(
        organizations = workloads.len(),
        jobs = jobs.len(),
        "Executing materialization jobs"
    );

    let batch = execute_batch(store, &jobs, settings.max_concurrent_jobs, limits).await;
    let windows_updated = update_windows(store, workloads, &batch, now).await;

    if settings.enable_post_processing {
        // Advisory only; its errors are logged inside and never escalate.
        run_post_processing(store, workloads, &batch, now).await;
    }

    WorkerResult {
        organizations_processed: u32::try_from(workloads.len()).unwrap_or(u32::MAX),
        events_processed: u32::try_from(jobs.len()).unwrap_or(u32::MAX),
        instances_created: batch.total_instances_created,
        windows_updated,
        errors_encountered: batch.errors_encountered(),
        processing_time_ms: 0,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
