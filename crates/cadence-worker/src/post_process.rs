//! Bookkeeping after a batch settles: advancing window frontiers and
//! best-effort retention pruning.

use chrono::{DateTime, Utc};
use cadence_recurrence::dates::add_months_safely;
use cadence_store::MaterializationStore;

use crate::types::{BatchResult, DiscoveredWorkload, PostProcessingResult};

/// ## Summary
/// Advances each organization's window frontier to the furthest window end
/// its successful jobs covered. Organizations whose jobs all failed keep
/// their old frontier so the next run retries them. Returns how many
/// windows were updated; update failures are logged and skipped.
pub async fn update_windows<S: MaterializationStore>(
    store: &S,
    workloads: &[DiscoveredWorkload],
    batch: &BatchResult,
    now: DateTime<Utc>,
) -> u32 {
    let mut windows_updated = 0u32;

    for workload in workloads {
        let successes: Vec<_> = batch
            .outcomes
            .iter()
            .filter(|o| o.success && o.job.organization_id == workload.organization_id)
            .collect();

        let Some(new_window_end) = successes.iter().map(|o| o.job.window_end_date).max() else {
            continue;
        };
        let instances_added: u32 = successes.iter().map(|o| o.instances_created).sum();

        match store
            .update_window_after_processing(workload.window.id, new_window_end, instances_added, now)
            .await
        {
            Ok(()) => windows_updated += 1,
            Err(error) => {
                tracing::error!(
                    organization_id = %workload.organization_id,
                    window_id = %workload.window.id,
                    %error,
                    "Failed to advance materialization window"
                );
            }
        }
    }

    windows_updated
}

/// ## Summary
/// Best-effort cleanup after a batch: prunes instances older than each
/// organization's retention horizon and logs aggregate counts. Failures are
/// collected in the result but never escalate to fail the run.
#[tracing::instrument(skip_all)]
pub async fn run_post_processing<S: MaterializationStore>(
    store: &S,
    workloads: &[DiscoveredWorkload],
    batch: &BatchResult,
    now: DateTime<Utc>,
) -> PostProcessingResult {
    let mut result = PostProcessingResult::default();

    for workload in workloads {
        let retention_months =
            i32::try_from(workload.window.history_retention_months).unwrap_or(i32::MAX);
        let cutoff = add_months_safely(now, -retention_months);

        match store
            .delete_instances_ending_before(workload.organization_id, cutoff)
            .await
        {
            Ok(deleted) => result.instances_deleted += deleted,
            Err(error) => {
                tracing::warn!(
                    organization_id = %workload.organization_id,
                    %error,
                    "Retention pruning failed"
                );
                result.errors.push(error.to_string());
            }
        }
    }

    tracing::info!(
        instances_created = batch.total_instances_created,
        instances_deleted = result.instances_deleted,
        errors = result.errors.len(),
        "Post-processing complete"
    );

    result
}
