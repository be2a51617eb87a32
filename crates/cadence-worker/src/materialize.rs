//! The per-job materialization service: one template event, one window.

use cadence_recurrence::{GeneratorLimits, generate_materialized_occurrences};
use cadence_store::{MaterializationStore, NewMaterializedInstance};

use crate::error::WorkerError;
use crate::types::MaterializationJob;

/// ## Summary
/// Materializes one job: loads the template, its rule, and its exceptions,
/// generates the occurrence sequence over the job window, and upserts the
/// result. Returns the number of newly inserted instances; re-running the
/// same job inserts nothing.
///
/// ## Errors
/// Returns an error when the template or rule cannot be loaded, when the
/// stored rule is unusable, or when the upsert fails.
#[tracing::instrument(
    skip(store, job, limits),
    fields(
        organization_id = %job.organization_id,
        event_id = %job.base_recurring_event_id,
    )
)]
pub async fn materialize_job<S: MaterializationStore>(
    store: &S,
    job: &MaterializationJob,
    limits: GeneratorLimits,
) -> Result<u64, WorkerError> {
    let template = store.template_event(job.base_recurring_event_id).await?;
    let stored_rule = store.rule_for_event(job.base_recurring_event_id).await?;
    let rule = stored_rule.to_engine_rule()?;

    let exceptions: Vec<_> = store
        .exceptions_for_event(job.base_recurring_event_id)
        .await?
        .iter()
        .map(cadence_store::EventException::to_overlay)
        .collect();

    let occurrences = generate_materialized_occurrences(
        template.start_at,
        template.end_at,
        &rule,
        job.window_start_date,
        job.window_end_date,
        &exceptions,
        limits,
    )?;

    let instances: Vec<NewMaterializedInstance> = occurrences
        .iter()
        .map(|o| NewMaterializedInstance::from_occurrence(template.id, template.organization_id, o))
        .collect();

    let inserted = store.upsert_instances(&instances).await?;
    tracing::debug!(
        generated = occurrences.len(),
        inserted,
        "Materialized job window"
    );
    Ok(inserted)
}
