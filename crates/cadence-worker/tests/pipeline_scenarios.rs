//! End-to-end worker pipeline scenarios against the in-memory store:
//! discovery through execution, window advancement, and the error boundary.

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use cadence_core::config::WorkerSettings;
use cadence_recurrence::GeneratorLimits;
use cadence_store::{
    EventException, MaterializationStore, MaterializationWindow, MemoryStore, StoredRecurrenceRule,
    TemplateEvent,
};
use cadence_worker::{run_for_organization, run_retention_cleanup, run_worker};

fn settings() -> WorkerSettings {
    WorkerSettings {
        max_concurrent_jobs: 5,
        max_organizations: 50,
        enable_post_processing: true,
        look_ahead_months: 1,
        priority_threshold: 5,
    }
}

fn window(organization_id: Uuid, end: DateTime<Utc>) -> MaterializationWindow {
    MaterializationWindow {
        id: Uuid::new_v4(),
        organization_id,
        current_window_end_date: end,
        hot_window_months_ahead: 1,
        history_retention_months: 3,
        processing_priority: 5,
        is_enabled: true,
        last_processed_at: None,
        last_processed_instance_count: None,
    }
}

fn template(organization_id: Uuid, start: DateTime<Utc>) -> TemplateEvent {
    TemplateEvent {
        id: Uuid::new_v4(),
        organization_id,
        name: "weekly sync".to_string(),
        start_at: start,
        end_at: start + TimeDelta::hours(1),
    }
}

fn daily_rule(event: &TemplateEvent, count: Option<u32>, interval: Option<i32>) -> StoredRecurrenceRule {
    StoredRecurrenceRule {
        id: Uuid::new_v4(),
        event_id: event.id,
        organization_id: event.organization_id,
        frequency: "DAILY".to_string(),
        interval,
        by_day: Vec::new(),
        by_month: Vec::new(),
        by_month_day: Vec::new(),
        count,
        recurrence_start_date: event.start_at,
        recurrence_end_date: None,
    }
}

async fn seed_org(store: &MemoryStore, now: DateTime<Utc>) -> (Uuid, Uuid, Uuid) {
    let organization_id = Uuid::new_v4();
    let win = window(organization_id, now - TimeDelta::days(1));
    let window_id = win.id;
    store.insert_window(win).await;

    // A well-formed bounded series starting just ahead of the frontier.
    let good = template(organization_id, now + TimeDelta::hours(1));
    let good_id = good.id;
    store.insert_rule(daily_rule(&good, Some(5), None)).await;
    store.insert_event(good).await;

    // A series the generator rejects: interval below 1 with no count, so it
    // survives discovery and normalization but fails at execution.
    let bad = template(organization_id, now + TimeDelta::hours(2));
    store.insert_rule(daily_rule(&bad, None, Some(0))).await;
    store.insert_event(bad).await;

    (organization_id, window_id, good_id)
}

#[test_log::test(tokio::test)]
async fn test_full_run_materializes_and_advances_the_window() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let (_, window_id, good_id) = seed_org(&store, now).await;

    let result = run_worker(&store, &settings(), GeneratorLimits::default()).await;

    assert_eq!(result.organizations_processed, 1);
    assert_eq!(result.events_processed, 2);
    assert_eq!(result.instances_created, 5);
    assert_eq!(result.windows_updated, 1);
    // The interval-0 job fails in isolation.
    assert_eq!(result.errors_encountered, 1);

    let instances = store.instances_for_event(good_id).await;
    assert_eq!(instances.len(), 5);
    assert_eq!(instances[0].sequence_number, 1);
    assert!(instances.iter().all(|i| i.total_count == 5));

    let advanced = store.window(window_id).await.unwrap();
    assert!(advanced.current_window_end_date > now + TimeDelta::days(20));
    assert!(advanced.last_processed_at.is_some());
    assert_eq!(advanced.last_processed_instance_count, Some(5));
}

#[test_log::test(tokio::test)]
async fn test_cooldown_holds_back_a_just_processed_window() {
    let store = MemoryStore::new();
    let now = Utc::now();
    seed_org(&store, now).await;

    let first = run_worker(&store, &settings(), GeneratorLimits::default()).await;
    assert_eq!(first.organizations_processed, 1);

    // Immediately after, the window is both advanced and inside the
    // reprocessing cooldown; the run short-circuits.
    let second = run_worker(&store, &settings(), GeneratorLimits::default()).await;
    assert_eq!(second.organizations_processed, 0);
    assert_eq!(second.instances_created, 0);
    assert_eq!(second.errors_encountered, 0);
}

#[test_log::test(tokio::test)]
async fn test_count_bounded_rule_with_zero_interval_does_not_poison_the_run() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let organization_id = Uuid::new_v4();
    let win = window(organization_id, now - TimeDelta::days(1));
    let window_id = win.id;
    store.insert_window(win).await;

    let good = template(organization_id, now + TimeDelta::hours(1));
    let good_id = good.id;
    store.insert_rule(daily_rule(&good, Some(5), None)).await;
    store.insert_event(good).await;

    // Zero interval plus a count has no computable completion date. The
    // event is dropped at job conversion; the rest of the batch proceeds.
    let bad = template(organization_id, now + TimeDelta::hours(2));
    store.insert_rule(daily_rule(&bad, Some(5), Some(0))).await;
    store.insert_event(bad).await;

    let result = run_worker(&store, &settings(), GeneratorLimits::default()).await;

    assert_eq!(result.organizations_processed, 1);
    assert_eq!(result.events_processed, 1);
    assert_eq!(result.instances_created, 5);
    assert_eq!(result.errors_encountered, 0);
    assert_eq!(store.instances_for_event(good_id).await.len(), 5);
    let advanced = store.window(window_id).await.unwrap();
    assert!(advanced.current_window_end_date > now);
}

#[test_log::test(tokio::test)]
async fn test_negative_interval_rules_are_skipped_in_discovery() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let organization_id = Uuid::new_v4();
    store
        .insert_window(window(organization_id, now - TimeDelta::days(1)))
        .await;

    let good = template(organization_id, now + TimeDelta::hours(1));
    let good_id = good.id;
    store.insert_rule(daily_rule(&good, Some(5), None)).await;
    store.insert_event(good).await;

    // A negative interval fails the plausibility check and never reaches
    // the generator, so it produces no job and no error.
    let bad = template(organization_id, now + TimeDelta::hours(2));
    store.insert_rule(daily_rule(&bad, None, Some(-1))).await;
    store.insert_event(bad).await;

    let result = run_worker(&store, &settings(), GeneratorLimits::default()).await;

    assert_eq!(result.events_processed, 1);
    assert_eq!(result.instances_created, 5);
    assert_eq!(result.errors_encountered, 0);
    assert_eq!(store.instances_for_event(good_id).await.len(), 5);
}

#[test_log::test(tokio::test)]
async fn test_windows_advance_with_post_processing_disabled() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let organization_id = Uuid::new_v4();
    let win = window(organization_id, now - TimeDelta::days(1));
    let window_id = win.id;
    store.insert_window(win).await;

    let event = template(organization_id, now + TimeDelta::hours(1));
    let event_id = event.id;
    store.insert_rule(daily_rule(&event, Some(3), None)).await;
    store.insert_event(event).await;

    // History far past the 3 month retention horizon; pruning would
    // remove it.
    store
        .upsert_instances(&[cadence_store::NewMaterializedInstance {
            event_id,
            organization_id,
            original_start_time: now - TimeDelta::days(200),
            actual_start_time: now - TimeDelta::days(200),
            actual_end_time: now - TimeDelta::days(200) + TimeDelta::hours(1),
            is_cancelled: false,
            sequence_number: 1,
            total_count: 1,
        }])
        .await
        .unwrap();

    let mut config = settings();
    config.enable_post_processing = false;

    let result = run_worker(&store, &config, GeneratorLimits::default()).await;

    // The frontier still advances; the flag only gates retention pruning.
    assert_eq!(result.windows_updated, 1);
    assert_eq!(result.instances_created, 3);
    let advanced = store.window(window_id).await.unwrap();
    assert!(advanced.current_window_end_date > now + TimeDelta::days(20));
    assert!(advanced.last_processed_at.is_some());
    // The expired instance survives: 1 old + 3 new.
    assert_eq!(store.instances_for_event(event_id).await.len(), 4);
}

#[test_log::test(tokio::test)]
async fn test_zero_work_short_circuits_to_a_zero_result() {
    let store = MemoryStore::new();
    let result = run_worker(&store, &settings(), GeneratorLimits::default()).await;
    assert_eq!(result.organizations_processed, 0);
    assert_eq!(result.events_processed, 0);
    assert_eq!(result.instances_created, 0);
    assert_eq!(result.errors_encountered, 0);
}

#[test_log::test(tokio::test)]
async fn test_exceptions_flow_through_to_stored_instances() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let organization_id = Uuid::new_v4();
    store
        .insert_window(window(organization_id, now - TimeDelta::days(1)))
        .await;

    let event = template(organization_id, now + TimeDelta::hours(1));
    let event_id = event.id;
    store.insert_rule(daily_rule(&event, Some(3), None)).await;
    store
        .insert_exception(EventException {
            id: Uuid::new_v4(),
            event_id,
            original_start_time: event.start_at + TimeDelta::days(1),
            is_cancelled: true,
            start_at: None,
            end_at: None,
        })
        .await;
    store.insert_event(event).await;

    let result = run_worker(&store, &settings(), GeneratorLimits::default()).await;
    assert_eq!(result.instances_created, 3);

    let instances = store.instances_for_event(event_id).await;
    assert_eq!(instances.len(), 3);
    // The cancelled slot is stored, still holding its sequence number.
    assert!(instances[1].is_cancelled);
    assert_eq!(instances[1].sequence_number, 2);
    assert!(!instances[0].is_cancelled);
    assert!(!instances[2].is_cancelled);
}

#[test_log::test(tokio::test)]
async fn test_on_demand_rerun_is_idempotent() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let (organization_id, _, good_id) = seed_org(&store, now).await;

    let first = run_worker(&store, &settings(), GeneratorLimits::default()).await;
    assert_eq!(first.instances_created, 5);

    // Manual trigger bypasses the cooldown but upserts collapse, so nothing
    // new is inserted.
    let rerun =
        run_for_organization(&store, &settings(), GeneratorLimits::default(), organization_id)
            .await;
    assert_eq!(rerun.organizations_processed, 1);
    assert_eq!(rerun.instances_created, 0);
    assert_eq!(store.instances_for_event(good_id).await.len(), 5);
}

#[test_log::test(tokio::test)]
async fn test_on_demand_run_for_unknown_organization_reports_one_error() {
    let store = MemoryStore::new();
    let result =
        run_for_organization(&store, &settings(), GeneratorLimits::default(), Uuid::new_v4())
            .await;
    assert_eq!(result.errors_encountered, 1);
    assert_eq!(result.instances_created, 0);
}

#[test_log::test(tokio::test)]
async fn test_retention_cleanup_prunes_only_expired_history() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let organization_id = Uuid::new_v4();
    store
        .insert_window(window(organization_id, now + TimeDelta::days(20)))
        .await;

    // One instance far past the 3 month retention horizon, one recent.
    let event = template(organization_id, now - TimeDelta::days(200));
    let event_id = event.id;
    store
        .upsert_instances(&[
            cadence_store::NewMaterializedInstance {
                event_id,
                organization_id,
                original_start_time: now - TimeDelta::days(200),
                actual_start_time: now - TimeDelta::days(200),
                actual_end_time: now - TimeDelta::days(200) + TimeDelta::hours(1),
                is_cancelled: false,
                sequence_number: 1,
                total_count: 2,
            },
            cadence_store::NewMaterializedInstance {
                event_id,
                organization_id,
                original_start_time: now - TimeDelta::days(1),
                actual_start_time: now - TimeDelta::days(1),
                actual_end_time: now - TimeDelta::days(1) + TimeDelta::hours(1),
                is_cancelled: false,
                sequence_number: 2,
                total_count: 2,
            },
        ])
        .await
        .unwrap();

    let result = run_retention_cleanup(&store, now).await;
    assert_eq!(result.organizations_processed, 1);
    assert_eq!(result.instances_deleted, 1);
    assert_eq!(result.errors_encountered, 0);
    assert_eq!(store.instances_for_event(event_id).await.len(), 1);
}
