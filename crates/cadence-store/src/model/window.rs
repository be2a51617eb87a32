//! Model for per-organization materialization windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The materialization state of one organization.
///
/// `current_window_end_date` is the frontier: instances exist up to it, and
/// the worker extends it as the hot window approaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializationWindow {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Frontier up to which instances have been materialized.
    pub current_window_end_date: DateTime<Utc>,
    /// How far past "now" the window should reach, in months.
    pub hot_window_months_ahead: u32,
    /// How long old instances are kept, in months.
    pub history_retention_months: u32,
    /// Base priority for workload scoring. Values below 1 fall back to 5.
    pub processing_priority: i32,
    pub is_enabled: bool,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub last_processed_instance_count: Option<u32>,
}
