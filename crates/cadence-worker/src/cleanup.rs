//! Standalone retention cleanup pass over every enabled organization.
//!
//! Runs on its own schedule, independent of materialization, so retention
//! keeps shrinking history even for organizations with no new work.

use std::time::Instant;

use chrono::{DateTime, Utc};
use cadence_recurrence::dates::add_months_safely;
use cadence_store::MaterializationStore;

use crate::types::CleanupResult;

/// ## Summary
/// Deletes instances that ended before each enabled organization's
/// retention horizon. Per-organization failures are counted and skipped;
/// the pass never aborts early.
#[tracing::instrument(skip(store))]
pub async fn run_retention_cleanup<S: MaterializationStore>(
    store: &S,
    now: DateTime<Utc>,
) -> CleanupResult {
    let started = Instant::now();
    let mut result = CleanupResult::default();

    let windows = match store.enabled_windows().await {
        Ok(windows) => windows,
        Err(error) => {
            tracing::error!(%error, "Retention cleanup could not list organizations");
            result.errors_encountered = 1;
            result.processing_time_ms = elapsed_ms(started);
            return result;
        }
    };

    for window in windows {
        let retention_months = i32::try_from(window.history_retention_months).unwrap_or(i32::MAX);
        let cutoff = add_months_safely(now, -retention_months);

        match store
            .delete_instances_ending_before(window.organization_id, cutoff)
            .await
        {
            Ok(deleted) => {
                result.organizations_processed += 1;
                result.instances_deleted += deleted;
            }
            Err(error) => {
                tracing::error!(
                    organization_id = %window.organization_id,
                    %error,
                    "Retention cleanup failed for organization"
                );
                result.errors_encountered += 1;
            }
        }
    }

    result.processing_time_ms = elapsed_ms(started);
    tracing::info!(
        organizations = result.organizations_processed,
        instances_deleted = result.instances_deleted,
        errors = result.errors_encountered,
        "Retention cleanup complete"
    );
    result
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
