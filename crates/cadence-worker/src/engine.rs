//! Bounded-concurrency execution of materialization jobs.

use std::time::Instant;

use cadence_recurrence::GeneratorLimits;
use cadence_store::MaterializationStore;
use futures::future::join_all;

use crate::materialize::materialize_job;
use crate::types::{BatchResult, JobOutcome, MaterializationJob};

/// ## Summary
/// Runs jobs in chunks of `max_concurrency`: every job inside a chunk runs
/// concurrently, and the next chunk starts only after the previous one has
/// fully settled. A failing job is captured in its outcome and never aborts
/// siblings. The batch `success` flag is true only when zero jobs failed.
#[tracing::instrument(skip(store, jobs, limits), fields(jobs = jobs.len()))]
pub async fn execute_batch<S: MaterializationStore>(
    store: &S,
    jobs: &[MaterializationJob],
    max_concurrency: usize,
    limits: GeneratorLimits,
) -> BatchResult {
    let mut outcomes = Vec::with_capacity(jobs.len());

    for chunk in jobs.chunks(max_concurrency.max(1)) {
        let settled = join_all(chunk.iter().map(|job| run_job(store, job, limits))).await;
        outcomes.extend(settled);
    }

    let total_instances_created = outcomes
        .iter()
        .map(|o| u64::from(o.instances_created))
        .sum();
    let failures: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.error.clone())
        .collect();
    let error_message = if failures.is_empty() {
        None
    } else {
        Some(failures.join("; "))
    };

    let result = BatchResult {
        success: error_message.is_none(),
        outcomes,
        total_instances_created,
        error_message,
    };

    tracing::info!(
        success = result.success,
        instances_created = result.total_instances_created,
        failed_jobs = result.errors_encountered(),
        "Materialization batch settled"
    );

    result
}

async fn run_job<S: MaterializationStore>(
    store: &S,
    job: &MaterializationJob,
    limits: GeneratorLimits,
) -> JobOutcome {
    let started = Instant::now();
    let result = materialize_job(store, job, limits).await;
    let execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(inserted) => {
            let instances_created = u32::try_from(inserted).unwrap_or(u32::MAX);
            JobOutcome {
                job: job.clone(),
                success: true,
                instances_created,
                execution_time_ms,
                processing_throughput: throughput(instances_created, execution_time_ms),
                error: None,
            }
        }
        Err(error) => {
            tracing::error!(
                organization_id = %job.organization_id,
                event_id = %job.base_recurring_event_id,
                %error,
                "Materialization job failed"
            );
            JobOutcome {
                job: job.clone(),
                success: false,
                instances_created: 0,
                execution_time_ms,
                processing_throughput: 0.0,
                error: Some(error.to_string()),
            }
        }
    }
}

/// Instances per second of execution; 0 for instantaneous runs so the
/// metric never divides by zero.
fn throughput(instances_created: u32, execution_time_ms: u64) -> f64 {
    if execution_time_ms == 0 {
        return 0.0;
    }
    let seconds = duration_seconds(execution_time_ms);
    f64::from(instances_created) / seconds
}

#[expect(clippy::cast_precision_loss)]
fn duration_seconds(ms: u64) -> f64 {
    ms as f64 / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_guards_against_zero_duration() {
        assert!((throughput(100, 0) - 0.0).abs() < f64::EPSILON);
        assert!((throughput(100, 2_000) - 50.0).abs() < f64::EPSILON);
    }
}
