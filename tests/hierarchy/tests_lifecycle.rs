//! Lifecycle tests: when the shared snapshot is rebuilt, refreshed or kept.

use std::sync::{Arc, Barrier};
use std::thread;

use tokio_util::sync::CancellationToken;
use typehier::model::{DeltaFlags, ModelError, ModelEvent};
use typehier::{
    HierarchyConfig, HierarchyError, HierarchyEvent, HierarchyLifecycle, HierarchyMode,
    HierarchyView, InputScope, RefreshOutcome, ViewPolicy,
};

use crate::helpers::model_fixtures::*;
use crate::helpers::tree_helpers::{child_names, record_events, type_node};

fn scope(name: &str) -> InputScope {
    InputScope::Type(type_id(name))
}

// =============================================================================
// REBUILD / REFRESH / NO-OP
// =============================================================================

#[test]
fn test_second_ensure_is_noop() {
    let db = world();
    let lifecycle = HierarchyLifecycle::new(db.clone(), HierarchyMode::Full);
    let cancel = CancellationToken::new();

    let first = lifecycle.ensure_refreshed(&scope("p.A"), &cancel).unwrap();
    let second = lifecycle.ensure_refreshed(&scope("p.A"), &cancel).unwrap();

    assert_eq!(first, RefreshOutcome::Rebuilt);
    assert_eq!(second, RefreshOutcome::Unchanged);
    assert_eq!(db.build_count(), 1);
    assert_eq!(db.refresh_count(), 0);
}

#[test]
fn test_force_full_rebuild_always_rebuilds() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let before = lifecycle.snapshot().unwrap();

    let outcome = lifecycle
        .force_full_rebuild(&CancellationToken::new())
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Rebuilt);
    assert_eq!(db.build_count(), 2);
    assert!(!Arc::ptr_eq(&before, &lifecycle.snapshot().unwrap()));
    assert_eq!(lifecycle.input_scope(), Some(scope("p.A")));
}

#[test]
fn test_scope_change_rebuilds() {
    let db = world();
    let lifecycle = focused(&db, "p.A");

    let outcome = lifecycle
        .ensure_refreshed(&scope("p.C"), &CancellationToken::new())
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Rebuilt);
    assert_eq!(db.build_count(), 2);
    let snapshot = lifecycle.snapshot().unwrap();
    assert_eq!(snapshot.focus_type(), Some(type_id("p.C")));
    assert!(!snapshot.contains(&type_id("p.B")));
}

#[test]
fn test_stale_signal_refreshes_in_place() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let events = record_events(&lifecycle);
    let before = lifecycle.snapshot().unwrap();

    db.set_superclass(&type_id("p.C"), Some("p.B"));
    assert!(lifecycle.is_stale());
    assert_eq!(*events.lock(), vec![HierarchyEvent::Full]);

    let outcome = lifecycle
        .ensure_refreshed(&scope("p.A"), &CancellationToken::new())
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert!(!lifecycle.is_stale());
    assert_eq!(db.build_count(), 1);
    assert_eq!(db.refresh_count(), 1);
    let after = lifecycle.snapshot().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.superclass(&type_id("p.C")), Some(type_id("p.B")));
}

#[test]
fn test_generation_moves_on_refresh() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let generation = lifecycle.generation();

    db.set_superclass(&type_id("p.C"), Some("p.B"));
    lifecycle
        .ensure_refreshed(&scope("p.A"), &CancellationToken::new())
        .unwrap();

    assert!(lifecycle.generation() > generation);
}

#[test]
fn test_supertypes_only_mode() {
    let db = world();
    let lifecycle = refreshed(&db, HierarchyMode::SupertypesOnly, &scope("p.B"));
    let snapshot = lifecycle.snapshot().unwrap();

    assert!(snapshot.contains(&type_id("p.A")));
    assert!(snapshot.contains(&type_id("Object")));
    assert!(!snapshot.contains(&type_id("q.D")));
}

// =============================================================================
// REGIONS
// =============================================================================

#[test]
fn test_project_region_skips_external_roots() {
    let db = world();
    let lifecycle = refreshed(&db, HierarchyMode::Full, &InputScope::region(["proj"]));
    let snapshot = lifecycle.snapshot().unwrap();

    assert_eq!(snapshot.focus_type(), None);
    for name in ["p.A", "p.A$Inner", "p.B", "p.C", "q.D"] {
        assert!(snapshot.contains(&type_id(name)), "{name} should be in the region");
    }
    // Only present as a supertype of region types.
    assert!(snapshot.contains(&type_id("Object")));
    assert_eq!(snapshot.root_classes(), vec![type_id("Object")]);
}

#[test]
fn test_package_region() {
    let db = world();
    let lifecycle = refreshed(
        &db,
        HierarchyMode::Full,
        &InputScope::region(["proj/src/q"]),
    );
    let snapshot = lifecycle.snapshot().unwrap();

    assert!(snapshot.contains(&type_id("q.D")));
    assert!(snapshot.contains(&type_id("p.B")));
    assert!(!snapshot.contains(&type_id("p.C")));
}

// =============================================================================
// CANCELLATION AND FAILURES
// =============================================================================

#[test]
fn test_cancel_keeps_previous_snapshot() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let before = lifecycle.snapshot().unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = lifecycle.ensure_refreshed(&scope("p.B"), &cancel);

    assert_eq!(result, Err(HierarchyError::Cancelled));
    assert!(Arc::ptr_eq(&before, &lifecycle.snapshot().unwrap()));
    assert_eq!(lifecycle.input_scope(), Some(scope("p.A")));
    assert_eq!(db.subscriber_count(), 1);
}

#[test]
fn test_cancel_initial_build_leaves_lifecycle_empty() {
    let db = world();
    let lifecycle = HierarchyLifecycle::new(db.clone(), HierarchyMode::Full);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = lifecycle.ensure_refreshed(&scope("p.A"), &cancel);

    assert_eq!(result, Err(HierarchyError::Cancelled));
    assert!(lifecycle.snapshot().is_none());
    assert_eq!(db.subscriber_count(), 0);
}

#[test]
fn test_cancelled_refresh_stays_stale() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    db.set_superclass(&type_id("p.C"), Some("p.B"));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = lifecycle.ensure_refreshed(&scope("p.A"), &cancel);

    assert_eq!(result, Err(HierarchyError::Cancelled));
    assert!(lifecycle.is_stale());
    assert!(lifecycle.snapshot().is_some());
}

#[test]
fn test_compute_failure_clears() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    db.fail_builds(true);

    let result = lifecycle.force_full_rebuild(&CancellationToken::new());

    assert!(matches!(
        result,
        Err(HierarchyError::Compute(ModelError::Engine(_)))
    ));
    assert!(lifecycle.snapshot().is_none());
    assert!(lifecycle.input_scope().is_none());
    assert_eq!(db.subscriber_count(), 0);
}

#[test]
fn test_failed_refresh_clears() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    db.set_superclass(&type_id("p.C"), Some("p.B"));
    db.fail_builds(true);

    let result = lifecycle.ensure_refreshed(&scope("p.A"), &CancellationToken::new());

    assert!(matches!(result, Err(HierarchyError::Compute(_))));
    assert!(lifecycle.snapshot().is_none());
}

#[test]
fn test_missing_focus_clears() {
    let db = world();
    let lifecycle = focused(&db, "q.D");
    db.remove_type(&type_id("q.D"));

    let outcome = lifecycle
        .ensure_refreshed(&scope("q.D"), &CancellationToken::new())
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Cleared);
    assert!(lifecycle.snapshot().is_none());
    assert_eq!(db.subscriber_count(), 0);
}

// =============================================================================
// LISTENERS
// =============================================================================

#[test]
fn test_unit_change_reaches_listeners() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let events = record_events(&lifecycle);

    let delta = db.unit_delta(UNIT_B, DeltaFlags::CONTENT).unwrap();
    db.notify(&ModelEvent::Changed(delta));

    assert_eq!(
        *events.lock(),
        vec![HierarchyEvent::TypesChanged(vec![type_id("p.B")])]
    );
}

#[test]
fn test_fine_grained_change_is_silent() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let events = record_events(&lifecycle);

    let delta = db
        .unit_delta(UNIT_B, DeltaFlags::CONTENT | DeltaFlags::FINE_GRAINED)
        .unwrap();
    db.notify(&ModelEvent::Changed(delta));

    assert!(events.lock().is_empty());
}

#[test]
fn test_changes_ignored_while_stale() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let events = record_events(&lifecycle);

    db.set_superclass(&type_id("p.C"), Some("p.B"));
    let delta = db.unit_delta(UNIT_B, DeltaFlags::CONTENT).unwrap();
    db.notify(&ModelEvent::Changed(delta));

    assert_eq!(*events.lock(), vec![HierarchyEvent::Full]);
}

#[test]
fn test_removed_listener_is_not_called() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let events = Arc::new(parking_lot::Mutex::new(0usize));
    let counter = events.clone();
    let id = lifecycle.add_change_listener(move |_| *counter.lock() += 1);

    assert!(lifecycle.remove_change_listener(id));
    db.set_superclass(&type_id("p.C"), Some("p.B"));

    assert_eq!(*events.lock(), 0);
    assert_eq!(lifecycle.listener_count(), 0);
}

#[test]
fn test_no_events_after_free() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let events = record_events(&lifecycle);

    lifecycle.free();
    db.set_superclass(&type_id("p.C"), Some("p.B"));

    assert!(events.lock().is_empty());
    assert!(!lifecycle.is_stale());
}

// =============================================================================
// THREADS
// =============================================================================

#[test]
fn test_concurrent_ensure_builds_once() {
    let db = world();
    let lifecycle = Arc::new(HierarchyLifecycle::new(db.clone(), HierarchyMode::Full));
    let barrier = Barrier::new(2);

    let outcomes: Vec<RefreshOutcome> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    lifecycle
                        .ensure_refreshed(&scope("p.A"), &CancellationToken::new())
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(db.build_count(), 1);
    assert!(outcomes.contains(&RefreshOutcome::Rebuilt));
    assert!(outcomes.contains(&RefreshOutcome::Unchanged));
}

#[test]
fn test_stale_signal_from_another_thread() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = HierarchyView::new(
        lifecycle.clone(),
        ViewPolicy::Subtype,
        HierarchyConfig::default(),
    );

    thread::scope(|s| {
        let writer = s.spawn(|| db.set_superclass(&type_id("p.C"), Some("p.B")));
        while !writer.is_finished() {
            let _ = view.children(&type_node("p.A"));
        }
        assert!(writer.join().unwrap());
    });

    // The callback only marks staleness; nothing was rebuilt.
    assert!(lifecycle.is_stale());
    assert_eq!(db.build_count(), 1);
    assert_eq!(db.refresh_count(), 0);

    let outcome = lifecycle
        .ensure_refreshed(&scope("p.A"), &CancellationToken::new())
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert_eq!(child_names(&view, "p.B"), vec!["p.C", "q.D"]);
}
