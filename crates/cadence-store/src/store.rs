//! The storage seam between the worker and whatever persists events.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::{
    EventException, MaterializationWindow, NewMaterializedInstance, StoredRecurrenceRule,
    TemplateEvent,
};

/// Persistence operations the materialization worker needs.
///
/// Implementations must make [`upsert_instances`](Self::upsert_instances)
/// idempotent on `(event_id, original_start_time)`; the worker re-runs
/// windows freely and relies on duplicates collapsing.
pub trait MaterializationStore: Send + Sync {
    /// Enabled windows whose frontier falls before `cutoff` and whose last
    /// processing (if any) predates `processed_before`, highest processing
    /// priority first, at most `limit` of them.
    fn windows_needing_work(
        &self,
        cutoff: DateTime<Utc>,
        processed_before: DateTime<Utc>,
        limit: usize,
    ) -> impl Future<Output = StoreResult<Vec<MaterializationWindow>>> + Send;

    /// All enabled windows, for maintenance passes that ignore the frontier.
    fn enabled_windows(
        &self,
    ) -> impl Future<Output = StoreResult<Vec<MaterializationWindow>>> + Send;

    /// The window row of one organization, regardless of staleness.
    fn window_for_organization(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = StoreResult<MaterializationWindow>> + Send;

    /// Recurring templates of an organization paired with their rules.
    /// Templates without a rule are not returned.
    fn recurring_templates_for_organization(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<(TemplateEvent, StoredRecurrenceRule)>>> + Send;

    /// One template event by id.
    fn template_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<TemplateEvent>> + Send;

    /// The recurrence rule attached to a template event.
    fn rule_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<StoredRecurrenceRule>> + Send;

    /// Exceptions recorded against a template event's instances.
    fn exceptions_for_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = StoreResult<Vec<EventException>>> + Send;

    /// Inserts instances, skipping ones whose natural key already exists.
    /// Returns how many were newly inserted.
    fn upsert_instances(
        &self,
        instances: &[NewMaterializedInstance],
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Advances a window's frontier and records the processing outcome.
    fn update_window_after_processing(
        &self,
        window_id: Uuid,
        new_window_end: DateTime<Utc>,
        instances_added: u32,
        processed_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Deletes an organization's instances that ended before `cutoff`.
    /// Returns how many were removed.
    fn delete_instances_ending_before(
        &self,
        organization_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<u64>> + Send;
}
