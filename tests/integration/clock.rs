//! Date-dependent defaults.
//!
//! The only non-deterministic input to a build is the clock consulted by
//! generated defaults; pinning it makes builds reproducible.

use crate::common::{fixtures, with_changes};
use chrono::{Datelike, TimeZone, Utc};
use cloud_resource_schemas::resources::budgets::Budget;
use cloud_resource_schemas::{
    BuildContext, BuiltResource, FixedClock, ResourceAttributes, ResourceRegistry,
};
use serde_json::json;

fn pinned(year: i32, month: u32, day: u32) -> BuildContext {
    BuildContext::new().with_clock(FixedClock::new(
        Utc.with_ymd_and_hms(year, month, day, 23, 59, 0).unwrap(),
    ))
}

#[test]
fn test_budget_start_uses_first_of_month() {
    let budget = Budget::build_with(&fixtures::budget(), &pinned(2024, 2, 29)).unwrap();
    assert_eq!(budget.time_period_start, "2024-02-01_00:00");

    let budget = Budget::build_with(&fixtures::budget(), &pinned(2025, 12, 31)).unwrap();
    assert_eq!(budget.time_period_start, "2025-12-01_00:00");
}

#[test]
fn test_pinned_builds_are_reproducible() {
    let registry = ResourceRegistry::with_defaults().with_context(pinned(2024, 7, 19));
    let first = registry
        .validate_and_build("aws_budgets_budget", &fixtures::budget())
        .unwrap();
    let second = registry
        .validate_and_build("aws_budgets_budget", &fixtures::budget())
        .unwrap();
    assert_eq!(first.to_canonical_map(), second.to_canonical_map());
}

#[test]
fn test_explicit_start_ignores_clock() {
    let raw = with_changes(
        &fixtures::budget(),
        json!({"time_period_start": "2023-01-01_00:00"}),
    );
    let budget = Budget::build_with(&raw, &pinned(2024, 7, 19)).unwrap();
    assert_eq!(budget.time_period_start, "2023-01-01_00:00");
}

#[test]
fn test_system_clock_default() {
    let month_start =
        |now: chrono::DateTime<Utc>| format!("{:04}-{:02}-01_00:00", now.year(), now.month());
    let before = month_start(Utc::now());
    let budget = Budget::build(&fixtures::budget()).unwrap();
    let after = month_start(Utc::now());
    assert!(
        budget.time_period_start == before || budget.time_period_start == after,
        "unexpected start {}",
        budget.time_period_start
    );
}

#[test]
fn test_end_before_generated_start_rejected() {
    let raw = with_changes(
        &fixtures::budget(),
        json!({"time_period_end": "2024-06-30_00:00"}),
    );
    assert!(Budget::build_with(&raw, &pinned(2024, 7, 19)).is_err());
    assert!(Budget::build_with(&raw, &pinned(2024, 5, 19)).is_ok());
}
