//! Finds organizations whose materialization window is stale and turns them
//! into prioritized, executable jobs.

use chrono::{DateTime, TimeDelta, Utc};
use cadence_core::config::WorkerSettings;
use cadence_recurrence::dates::add_months_safely;
use cadence_recurrence::{estimate_instance_count, normalize_to_end_date, validate_rule_fields};
use cadence_store::{MaterializationStore, MaterializationWindow};
use uuid::Uuid;

use crate::error::WorkerError;
use crate::types::{DiscoveredWorkload, MaterializationJob, RecurringEventInfo};

/// Windows processed more recently than this are held back from discovery.
const REPROCESS_COOLDOWN: TimeDelta = TimeDelta::hours(1);

/// Buffer added past a series' natural end so the final occurrence is never
/// cut off by window rounding.
const SERIES_END_BUFFER: TimeDelta = TimeDelta::days(7);

/// ## Summary
/// Discovers organizations needing materialization work and scores each as
/// a workload, highest priority first. Per-organization failures are logged
/// and skipped; discovery continues for the rest.
///
/// ## Errors
/// Returns an error only when the window query itself fails.
#[tracing::instrument(skip(store, settings), fields(look_ahead_months = settings.look_ahead_months))]
pub async fn discover_workloads<S: MaterializationStore>(
    store: &S,
    settings: &WorkerSettings,
    now: DateTime<Utc>,
) -> Result<Vec<DiscoveredWorkload>, WorkerError> {
    let cutoff = add_months_safely(now, i32::try_from(settings.look_ahead_months).unwrap_or(i32::MAX));
    let windows = store
        .windows_needing_work(cutoff, now - REPROCESS_COOLDOWN, settings.max_organizations)
        .await?;

    if windows.is_empty() {
        tracing::info!("No organizations need materialization work");
        return Ok(Vec::new());
    }

    let mut workloads = Vec::new();
    for window in windows {
        match build_workload(store, window, now, settings.priority_threshold).await {
            Ok(Some(workload)) => workloads.push(workload),
            Ok(None) => {}
            Err(error) => {
                tracing::error!(%error, "Failed to discover workload for organization");
            }
        }
    }

    workloads.sort_by(|a, b| b.priority.total_cmp(&a.priority));

    tracing::info!(
        workloads = workloads.len(),
        total_events = workloads.iter().map(|w| w.recurring_events.len()).sum::<usize>(),
        high_priority_workloads = workloads.iter().filter(|w| w.priority > 7.0).count(),
        "Discovered materialization workloads"
    );

    Ok(workloads)
}

/// ## Summary
/// Builds the workload of a single organization's window, or `None` when it
/// has no recurring templates. Used by both scheduled discovery and the
/// on-demand single-organization entry point.
///
/// ## Errors
/// Returns an error when the organization's templates cannot be loaded.
pub async fn build_workload<S: MaterializationStore>(
    store: &S,
    window: MaterializationWindow,
    now: DateTime<Utc>,
    priority_floor: u8,
) -> Result<Option<DiscoveredWorkload>, WorkerError> {
    let templates = store
        .recurring_templates_for_organization(window.organization_id)
        .await?;

    let mut recurring_events = Vec::new();
    for (event, rule) in templates {
        if !validate_rule_fields(&rule.frequency, rule.interval) {
            tracing::warn!(
                event_id = %event.id,
                rule_id = %rule.id,
                frequency = %rule.frequency,
                "Skipping event with implausible recurrence rule fields"
            );
            continue;
        }

        // A rule that fails conversion leaves its event unmaterialized but
        // never blocks the rest of the organization.
        let engine_rule = match rule.to_engine_rule() {
            Ok(engine_rule) => engine_rule,
            Err(error) => {
                tracing::warn!(
                    event_id = %event.id,
                    rule_id = %rule.id,
                    %error,
                    "Skipping event with an unusable recurrence rule"
                );
                continue;
            }
        };

        recurring_events.push(RecurringEventInfo {
            event_id: event.id,
            event_name: event.name,
            is_never_ending: rule.is_never_ending(),
            estimated_instances: estimate_instance_count(
                &engine_rule,
                rule.recurrence_start_date,
                None,
            ),
            rule,
        });
    }

    if recurring_events.is_empty() {
        return Ok(None);
    }

    let priority = calculate_workload_priority(&window, &recurring_events, now, priority_floor);
    let estimated_duration_ms = estimate_workload_duration(&recurring_events);

    Ok(Some(DiscoveredWorkload {
        organization_id: window.organization_id,
        window,
        recurring_events,
        priority,
        estimated_duration_ms,
    }))
}

/// ## Summary
/// Converts workloads into executable jobs, one per recurring event. Each
/// job's window runs from the organization's current frontier to the later
/// of the default hot window and the series' buffered natural end, so a
/// bounded series is always materialized to completion.
///
/// Events whose series end cannot be determined (a count bounded by an
/// interval below 1, for example) are logged and skipped; one bad rule
/// never blocks the batch.
#[must_use]
pub fn create_materialization_jobs(
    workloads: &[DiscoveredWorkload],
    now: DateTime<Utc>,
) -> Vec<MaterializationJob> {
    let mut jobs = Vec::new();

    for workload in workloads {
        let default_window_end = add_months_safely(
            now,
            i32::try_from(workload.window.hot_window_months_ahead).unwrap_or(i32::MAX),
        );

        for event in &workload.recurring_events {
            let series_end = match event.rule.to_engine_rule().and_then(|engine_rule| {
                normalize_to_end_date(&engine_rule, event.rule.recurrence_start_date)
            }) {
                Ok(series_end) => series_end,
                Err(error) => {
                    tracing::warn!(
                        organization_id = %workload.organization_id,
                        event_id = %event.event_id,
                        %error,
                        "Skipping event whose series end cannot be determined"
                    );
                    continue;
                }
            };

            let window_end_date = match series_end {
                Some(end) => (end + SERIES_END_BUFFER).max(default_window_end),
                None => default_window_end,
            };

            jobs.push(MaterializationJob {
                organization_id: workload.organization_id,
                base_recurring_event_id: event.event_id,
                window_start_date: workload.window.current_window_end_date,
                window_end_date,
            });
        }
    }

    jobs
}

fn calculate_workload_priority(
    window: &MaterializationWindow,
    recurring_events: &[RecurringEventInfo],
    now: DateTime<Utc>,
    priority_floor: u8,
) -> f64 {
    let mut priority = if window.processing_priority < 1 {
        5.0
    } else {
        f64::from(window.processing_priority)
    };

    // Never-ending events keep needing work forever; weight them up.
    let never_ending = recurring_events.iter().filter(|e| e.is_never_ending).count();
    if never_ending > 0 {
        let never_ending = f64::from(u32::try_from(never_ending).unwrap_or(u32::MAX));
        priority += (never_ending * 0.5).min(2.0);
    }

    // Urgency ramps up linearly over the last week before the frontier.
    let days_until_window_end = timedelta_days(window.current_window_end_date - now);
    if days_until_window_end < 7.0 {
        priority += ((7.0 - days_until_window_end) / 7.0 * 2.0).clamp(0.0, 2.0);
    }

    let total_events = recurring_events.len();
    if total_events > 10 {
        let total_events = f64::from(u32::try_from(total_events).unwrap_or(u32::MAX));
        priority += (total_events / 50.0).min(1.0);
    }

    priority.clamp(f64::from(priority_floor), 10.0)
}

fn estimate_workload_duration(recurring_events: &[RecurringEventInfo]) -> u64 {
    const BASE_MS: u64 = 5_000;
    const MS_PER_EVENT: u64 = 1_000;
    const MS_PER_INSTANCE: u64 = 10;

    let total_instances: u64 = recurring_events
        .iter()
        .map(|e| u64::from(e.estimated_instances))
        .sum();

    let event_count = u64::try_from(recurring_events.len()).unwrap_or(u64::MAX);
    BASE_MS + MS_PER_EVENT * event_count + MS_PER_INSTANCE * total_instances
}

#[expect(clippy::cast_precision_loss)]
fn timedelta_days(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 / 86_400.0
}

/// On-demand discovery for a single organization, bypassing the staleness
/// and cooldown filters.
///
/// ## Errors
/// Returns an error when the organization has no window row or its
/// templates cannot be loaded.
pub async fn discover_organization_workload<S: MaterializationStore>(
    store: &S,
    organization_id: Uuid,
    settings: &WorkerSettings,
    now: DateTime<Utc>,
) -> Result<Option<DiscoveredWorkload>, WorkerError> {
    let window = store.window_for_organization(organization_id).await?;
    build_workload(store, window, now, settings.priority_threshold).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_store::StoredRecurrenceRule;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn window(priority: i32, end: &str) -> MaterializationWindow {
        MaterializationWindow {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            current_window_end_date: utc(end),
            hot_window_months_ahead: 12,
            history_retention_months: 3,
            processing_priority: priority,
            is_enabled: true,
            last_processed_at: None,
            last_processed_instance_count: None,
        }
    }

    fn event_info(never_ending: bool) -> RecurringEventInfo {
        let rule = StoredRecurrenceRule {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            frequency: "DAILY".to_string(),
            interval: None,
            by_day: Vec::new(),
            by_month: Vec::new(),
            by_month_day: Vec::new(),
            count: if never_ending { None } else { Some(10) },
            recurrence_start_date: utc("2025-01-01T10:00:00Z"),
            recurrence_end_date: None,
        };
        RecurringEventInfo {
            event_id: rule.event_id,
            event_name: "standup".to_string(),
            is_never_ending: never_ending,
            estimated_instances: 30,
            rule,
        }
    }

    #[test]
    fn priority_defaults_and_weights_never_ending_events() {
        let now = utc("2025-01-01T00:00:00Z");
        let far_future = "2025-06-01T00:00:00Z";

        // Stored priority below 1 falls back to the base of 5.
        let base = calculate_workload_priority(&window(0, far_future), &[event_info(false)], now, 1);
        assert!((base - 5.0).abs() < f64::EPSILON);

        let boosted = calculate_workload_priority(
            &window(5, far_future),
            &[event_info(true), event_info(true), event_info(false)],
            now,
            1,
        );
        assert!((boosted - 6.0).abs() < f64::EPSILON);

        // The never-ending boost saturates at 2.
        let many: Vec<_> = (0..8).map(|_| event_info(true)).collect();
        let saturated = calculate_workload_priority(&window(5, far_future), &many, now, 1);
        assert!((saturated - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn priority_adds_urgency_and_caps_at_ten() {
        let now = utc("2025-01-01T00:00:00Z");

        // Frontier already passed: full urgency boost.
        let urgent =
            calculate_workload_priority(&window(5, "2025-01-01T00:00:00Z"), &[event_info(false)], now, 1);
        assert!((urgent - 7.0).abs() < f64::EPSILON);

        let capped = calculate_workload_priority(
            &window(9, "2025-01-01T00:00:00Z"),
            &(0..8).map(|_| event_info(true)).collect::<Vec<_>>(),
            now,
            1,
        );
        assert!((capped - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duration_estimate_weights_events_and_instances() {
        let events = vec![event_info(false), event_info(false)];
        // 5000 base + 2 * 1000 + 60 * 10
        assert_eq!(estimate_workload_duration(&events), 7_600);
    }

    #[test]
    fn jobs_extend_the_window_past_a_bounded_series_end() {
        let now = utc("2025-01-01T00:00:00Z");
        let mut wl_window = window(5, "2025-01-15T00:00:00Z");
        wl_window.hot_window_months_ahead = 1;

        // Daily, count 90: completes ~Mar 31, past the 1-month hot window.
        let mut info = event_info(false);
        info.rule.count = Some(90);

        let workload = DiscoveredWorkload {
            organization_id: wl_window.organization_id,
            window: wl_window,
            recurring_events: vec![info],
            priority: 5.0,
            estimated_duration_ms: 0,
        };

        let jobs = create_materialization_jobs(std::slice::from_ref(&workload), now);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].window_start_date, utc("2025-01-15T00:00:00Z"));
        // Series ends Mar 31 10:00; plus the 7 day buffer.
        assert_eq!(jobs[0].window_end_date, utc("2025-04-07T10:00:00Z"));
    }

    #[test]
    fn jobs_skip_rules_that_cannot_normalize() {
        let now = utc("2025-01-01T00:00:00Z");
        let wl_window = window(5, "2025-01-15T00:00:00Z");

        let good = event_info(false);
        // A count with a zero interval has no computable completion date.
        let mut bad = event_info(false);
        bad.rule.interval = Some(0);
        bad.rule.count = Some(5);

        let workload = DiscoveredWorkload {
            organization_id: wl_window.organization_id,
            window: wl_window,
            recurring_events: vec![bad, good.clone()],
            priority: 5.0,
            estimated_duration_ms: 0,
        };

        let jobs = create_materialization_jobs(std::slice::from_ref(&workload), now);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].base_recurring_event_id, good.event_id);
    }

    #[test]
    fn jobs_use_the_hot_window_for_never_ending_series() {
        let now = utc("2025-01-01T00:00:00Z");
        let mut wl_window = window(5, "2025-01-15T00:00:00Z");
        wl_window.hot_window_months_ahead = 12;

        let workload = DiscoveredWorkload {
            organization_id: wl_window.organization_id,
            window: wl_window,
            recurring_events: vec![event_info(true)],
            priority: 5.0,
            estimated_duration_ms: 0,
        };

        let jobs = create_materialization_jobs(std::slice::from_ref(&workload), now);
        assert_eq!(jobs[0].window_end_date, utc("2026-01-01T00:00:00Z"));
    }
}
