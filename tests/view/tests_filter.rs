//! Member filter tests: override-aware visibility and member children.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use typehier::{
    HierarchyConfig, HierarchyLifecycle, HierarchySorter, HierarchyView, InputScope, Member,
    MemberFilter, Modifiers, SortOrder, ViewPolicy,
};

use crate::helpers::model_fixtures::*;
use crate::helpers::tree_helpers::*;

fn subtype_view(lifecycle: &Arc<HierarchyLifecycle>) -> HierarchyView {
    HierarchyView::new(lifecycle.clone(), ViewPolicy::Subtype, HierarchyConfig::default())
}

fn filter(members: &[Member]) -> Option<MemberFilter> {
    Some(members.iter().cloned().collect())
}

fn visible_set(view: &HierarchyView) -> Vec<String> {
    let mut types = visible_types(view);
    types.sort();
    types
}

// =============================================================================
// VISIBILITY
// =============================================================================

#[test]
fn test_overriding_subtype_stays_visible() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);

    view.set_member_filter(filter(&[method("p.A", "foo")]));

    assert!(view.is_in_tree(&type_id("p.A")));
    assert!(view.is_in_tree(&type_id("p.B")));
    assert!(!view.is_in_tree(&type_id("p.C")));
    assert!(!view.is_in_tree(&type_id("q.D")));
    assert_eq!(visible_set(&view), vec!["Object", "p.A", "p.B"]);
}

#[test]
fn test_filter_members_listed_before_types() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);

    view.set_member_filter(filter(&[method("p.A", "foo")]));

    assert_eq!(child_names(&view, "p.A"), vec!["p.A#foo", "p.B"]);
    assert_eq!(child_names(&view, "p.B"), vec!["p.B#foo"]);
    assert!(view.has_children(&type_node("p.B")));
    assert!(!view.has_children(&type_node("p.C")));
}

#[test]
fn test_declared_filter_members_use_database_declarations() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);

    let bar = Member::method(type_id("p.A"), "bar", &["int"]);
    view.set_member_filter(filter(&[bar, method("p.A", "foo")]));

    let mut children = view.children(&type_node("p.A"));
    let offsets: Vec<u32> = children
        .iter()
        .filter_map(|node| node.as_member().map(|m| m.offset))
        .collect();
    assert_eq!(offsets, vec![20, 10]);

    HierarchySorter::new(lifecycle.clone(), SortOrder::SOURCE).sort(&mut children);
    assert_eq!(names(&children), vec!["p.B", "p.A#foo", "p.A#bar"]);
}

#[test]
fn test_overridden_method_in_supertype_is_compatible() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);

    view.set_member_filter(filter(&[method("p.B", "foo")]));

    assert_eq!(child_names(&view, "p.A"), vec!["p.A#foo", "p.B"]);
    assert!(!view.is_in_tree(&type_id("p.C")));
}

#[test]
fn test_private_filter_method_never_matches_by_compatibility() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);

    let private = method("p.A", "foo").with_modifiers(Modifiers::PRIVATE);
    view.set_member_filter(filter(&[private]));

    assert!(view.is_in_tree(&type_id("p.A")));
    assert!(!view.is_in_tree(&type_id("p.B")));
}

#[test]
fn test_enlarging_filter_only_grows_visible_set() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);
    let filters = [
        vec![method("p.C", "baz")],
        vec![method("p.C", "baz"), method("p.A", "foo")],
        vec![
            method("p.C", "baz"),
            method("p.A", "foo"),
            Member::method(type_id("p.A"), "bar", &["int"]),
        ],
    ];

    let mut previous: Vec<String> = Vec::new();
    for members in &filters {
        view.set_member_filter(filter(members));
        let visible = visible_set(&view);
        for name in &previous {
            assert!(visible.contains(name), "{name} vanished with {members:?}");
        }
        previous = visible;
    }
    assert_eq!(previous, vec!["Object", "p.A", "p.B", "p.C"]);
}

#[test]
fn test_changing_filter_recomputes_visibility() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);

    view.set_member_filter(filter(&[method("p.C", "baz")]));
    assert!(view.is_in_tree(&type_id("p.C")));

    view.set_member_filter(filter(&[method("p.A", "foo")]));
    assert!(!view.is_in_tree(&type_id("p.C")));

    view.set_member_filter(None);
    assert!(view.is_in_tree(&type_id("p.C")));
}

#[test]
fn test_supertype_view_with_filter() {
    let db = world();
    let lifecycle = focused(&db, "q.D");
    let view = HierarchyView::new(
        lifecycle.clone(),
        ViewPolicy::Supertype,
        HierarchyConfig::default(),
    );

    view.set_member_filter(filter(&[method("p.A", "foo")]));

    assert_eq!(names(&view.roots()), vec!["q.D"]);
    assert_eq!(child_names(&view, "q.D"), vec!["p.B"]);
    assert_eq!(child_names(&view, "p.B"), vec!["p.B#foo", "p.A"]);
    assert_eq!(child_names(&view, "p.A"), vec!["p.A#foo"]);
}

#[test]
fn test_set_scope_clears_filter() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);
    view.set_member_filter(filter(&[method("p.A", "foo")]));

    view.set_scope(&InputScope::Type(type_id("p.B")), &CancellationToken::new())
        .unwrap();

    assert!(view.member_filter().is_none());
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn test_unreadable_type_is_hidden_without_aborting() {
    let db = world();
    db.fail_type(&type_id("p.B"), true);
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);

    view.set_member_filter(filter(&[method("p.A", "foo")]));

    assert!(!view.is_in_tree(&type_id("p.B")));
    assert_eq!(visible_set(&view), vec!["Object", "p.A"]);
}

#[test]
fn test_type_changes_evict_cached_resolvers() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let view = subtype_view(&lifecycle);
    view.set_member_filter(filter(&[method("p.A", "foo")]));
    assert!(!view.is_in_tree(&type_id("p.C")));

    db.add_member(method("p.C", "foo"));
    let delta = db
        .unit_delta(UNIT_C, typehier::model::DeltaFlags::CONTENT)
        .unwrap();
    db.notify(&typehier::model::ModelEvent::Changed(delta));

    assert!(view.is_in_tree(&type_id("p.C")));
}
