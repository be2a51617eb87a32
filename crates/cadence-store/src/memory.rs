//! In-memory store backend.
//!
//! Backs the single-process deployment and the test suites. All maps live
//! behind one `RwLock` so multi-step writes stay atomic.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::{
    EventException, MaterializationWindow, MaterializedInstance, NewMaterializedInstance,
    StoredRecurrenceRule, TemplateEvent,
};
use crate::store::MaterializationStore;

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<Uuid, TemplateEvent>,
    /// Keyed by the template event id; one rule per template.
    rules: HashMap<Uuid, StoredRecurrenceRule>,
    windows: HashMap<Uuid, MaterializationWindow>,
    exceptions: HashMap<Uuid, Vec<EventException>>,
    /// Keyed by the natural key `(event_id, original_start_time)`.
    instances: HashMap<(Uuid, DateTime<Utc>), MaterializedInstance>,
}

/// A [`MaterializationStore`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, event: TemplateEvent) {
        self.inner.write().await.events.insert(event.id, event);
    }

    pub async fn insert_rule(&self, rule: StoredRecurrenceRule) {
        self.inner.write().await.rules.insert(rule.event_id, rule);
    }

    pub async fn insert_window(&self, window: MaterializationWindow) {
        self.inner.write().await.windows.insert(window.id, window);
    }

    pub async fn insert_exception(&self, exception: EventException) {
        self.inner
            .write()
            .await
            .exceptions
            .entry(exception.event_id)
            .or_default()
            .push(exception);
    }

    /// Stored instances of one template, ordered by original start time.
    pub async fn instances_for_event(&self, event_id: Uuid) -> Vec<MaterializedInstance> {
        let inner = self.inner.read().await;
        let mut instances: Vec<MaterializedInstance> = inner
            .instances
            .values()
            .filter(|i| i.event_id == event_id)
            .cloned()
            .collect();
        instances.sort_by_key(|i| i.original_start_time);
        instances
    }

    /// Total stored instance count across all organizations.
    pub async fn instance_count(&self) -> usize {
        self.inner.read().await.instances.len()
    }

    /// The current state of one window.
    pub async fn window(&self, window_id: Uuid) -> Option<MaterializationWindow> {
        self.inner.read().await.windows.get(&window_id).cloned()
    }
}

impl MaterializationStore for MemoryStore {
    async fn windows_needing_work(
        &self,
        cutoff: DateTime<Utc>,
        processed_before: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<MaterializationWindow>> {
        let inner = self.inner.read().await;
        let mut windows: Vec<MaterializationWindow> = inner
            .windows
            .values()
            .filter(|w| w.is_enabled && w.current_window_end_date < cutoff)
            .filter(|w| w.last_processed_at.is_none_or(|at| at < processed_before))
            .cloned()
            .collect();
        // Priority first; organization id breaks ties deterministically.
        windows.sort_by(|a, b| {
            b.processing_priority
                .cmp(&a.processing_priority)
                .then(a.organization_id.cmp(&b.organization_id))
        });
        windows.truncate(limit);
        Ok(windows)
    }

    async fn enabled_windows(&self) -> StoreResult<Vec<MaterializationWindow>> {
        let inner = self.inner.read().await;
        let mut windows: Vec<MaterializationWindow> = inner
            .windows
            .values()
            .filter(|w| w.is_enabled)
            .cloned()
            .collect();
        windows.sort_by_key(|w| w.organization_id);
        Ok(windows)
    }

    async fn window_for_organization(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<MaterializationWindow> {
        self.inner
            .read()
            .await
            .windows
            .values()
            .find(|w| w.organization_id == organization_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "materialization window",
                id: organization_id,
            })
    }

    async fn recurring_templates_for_organization(
        &self,
        organization_id: Uuid,
    ) -> StoreResult<Vec<(TemplateEvent, StoredRecurrenceRule)>> {
        let inner = self.inner.read().await;
        let mut templates: Vec<(TemplateEvent, StoredRecurrenceRule)> = inner
            .events
            .values()
            .filter(|e| e.organization_id == organization_id)
            .filter_map(|e| {
                inner
                    .rules
                    .get(&e.id)
                    .map(|rule| (e.clone(), rule.clone()))
            })
            .collect();
        templates.sort_by_key(|(e, _)| e.id);
        Ok(templates)
    }

    async fn template_event(&self, event_id: Uuid) -> StoreResult<TemplateEvent> {
        self.inner
            .read()
            .await
            .events
            .get(&event_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "template event",
                id: event_id,
            })
    }

    async fn rule_for_event(&self, event_id: Uuid) -> StoreResult<StoredRecurrenceRule> {
        self.inner
            .read()
            .await
            .rules
            .get(&event_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "recurrence rule",
                id: event_id,
            })
    }

    async fn exceptions_for_event(&self, event_id: Uuid) -> StoreResult<Vec<EventException>> {
        Ok(self
            .inner
            .read()
            .await
            .exceptions
            .get(&event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_instances(
        &self,
        instances: &[NewMaterializedInstance],
    ) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut inserted = 0u64;

        for new in instances {
            let key = (new.event_id, new.original_start_time);
            if inner.instances.contains_key(&key) {
                continue;
            }
            inner.instances.insert(
                key,
                MaterializedInstance {
                    id: Uuid::new_v4(),
                    event_id: new.event_id,
                    organization_id: new.organization_id,
                    original_start_time: new.original_start_time,
                    actual_start_time: new.actual_start_time,
                    actual_end_time: new.actual_end_time,
                    is_cancelled: new.is_cancelled,
                    sequence_number: new.sequence_number,
                    total_count: new.total_count,
                    generated_at: now,
                },
            );
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn update_window_after_processing(
        &self,
        window_id: Uuid,
        new_window_end: DateTime<Utc>,
        instances_added: u32,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let window = inner
            .windows
            .get_mut(&window_id)
            .ok_or(StoreError::NotFound {
                entity: "materialization window",
                id: window_id,
            })?;

        // The frontier only moves forward.
        if new_window_end > window.current_window_end_date {
            window.current_window_end_date = new_window_end;
        }
        window.last_processed_at = Some(processed_at);
        window.last_processed_instance_count = Some(instances_added);
        Ok(())
    }

    async fn delete_instances_ending_before(
        &self,
        organization_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.instances.len();
        inner
            .instances
            .retain(|_, i| i.organization_id != organization_id || i.actual_end_time >= cutoff);
        Ok(u64::try_from(before - inner.instances.len()).unwrap_or(u64::MAX))
    }
}
