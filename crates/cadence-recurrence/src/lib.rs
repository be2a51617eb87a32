//! Recurrence rule parsing and occurrence generation.
//!
//! Everything in this crate is pure and synchronous: rule strings go in,
//! ordered occurrence sequences come out. I/O and scheduling live in
//! `cadence-worker`.

pub mod dates;
pub mod error;
pub mod estimate;
pub mod generate;
pub mod parse;
pub mod rule;

pub use error::{RecurrenceError, RecurrenceResult};
pub use estimate::{completion_date_from_count, estimate_instance_count, normalize_to_end_date};
pub use generate::{
    GeneratorLimits, InstanceException, Occurrence, apply_exceptions,
    generate_materialized_occurrences, generate_occurrences, generate_occurrences_with_limits,
};
pub use parse::{parse_by_day_token, parse_rrule};
pub use rule::{ByDayEntry, Frequency, RecurrenceRule, validate_rule_fields};
