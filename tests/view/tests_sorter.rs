//! Sibling ordering tests.

use std::cmp::Ordering;
use std::sync::Arc;

use rstest::rstest;
use typehier::model::{DeltaFlags, ModelEvent, TypeDef};
use typehier::{
    HierarchyConfig, HierarchyLifecycle, HierarchyNode, HierarchySorter, HierarchyView,
    Member, SortOrder, SymbolDatabase, TypeId, ViewPolicy,
};

use crate::helpers::model_fixtures::*;
use crate::helpers::tree_helpers::*;

fn sorter(lifecycle: &Arc<HierarchyLifecycle>, alphabetic: bool, by_defining_type: bool) -> HierarchySorter {
    HierarchySorter::new(
        lifecycle.clone(),
        SortOrder {
            alphabetic,
            by_defining_type,
        },
    )
}

fn member(m: Member) -> HierarchyNode {
    HierarchyNode::Member(m)
}

fn sorted(sorter: &HierarchySorter, mut nodes: Vec<HierarchyNode>) -> Vec<String> {
    sorter.sort(&mut nodes);
    names(&nodes)
}

// =============================================================================
// DEFINING TYPE
// =============================================================================

#[test]
fn test_overriding_member_sorts_first() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, false, true);

    let nodes = vec![member(method("p.A", "foo")), member(method("p.B", "foo"))];

    assert_eq!(sorted(&sorter, nodes), vec!["p.B#foo", "p.A#foo"]);
}

#[test]
fn test_deeper_defining_type_sorts_first() {
    let db = world();
    db.add_member(method("p.B", "qux"));
    db.add_member(method("q.D", "foo"));
    db.add_member(method("q.D", "qux"));
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, false, true);

    // D.foo is defined by A, D.qux by B.
    let nodes = vec![member(method("q.D", "foo")), member(method("q.D", "qux"))];

    assert_eq!(sorted(&sorter, nodes), vec!["q.D#qux", "q.D#foo"]);
}

#[test]
fn test_same_defining_type_keeps_input_order() {
    let db = world();
    db.add_member(method("q.D", "foo"));
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, false, true);

    let nodes = vec![member(method("q.D", "foo")), member(method("p.B", "foo"))];

    assert_eq!(sorted(&sorter, nodes), vec!["q.D#foo", "p.B#foo"]);
}

#[test]
fn test_unresolved_members_fall_through_to_names() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, true, true);

    let nodes = vec![
        member(method("p.A", "foo")),
        member(Member::method(type_id("p.A"), "bar", &["int"])),
    ];

    assert_eq!(sorted(&sorter, nodes), vec!["p.A#bar", "p.A#foo"]);
}

#[test]
fn test_member_edit_changes_defining_type_order() {
    let db = world();
    db.add_member(method("p.C", "aaa"));
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, false, true);
    let (baz, aaa) = (member(method("p.C", "baz")), member(method("p.C", "aaa")));
    assert_eq!(sorter.compare(&baz, &aaa), Ordering::Equal);

    // C.baz now overrides A.baz.
    db.add_member(method("p.A", "baz"));
    let delta = db.unit_delta(UNIT_A, DeltaFlags::CONTENT).unwrap();
    db.notify(&ModelEvent::Changed(delta));

    assert_eq!(sorter.compare(&baz, &aaa), Ordering::Less);
}

#[test]
fn test_dropping_sorter_removes_listener() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, true, true);
    assert_eq!(lifecycle.listener_count(), 1);

    drop(sorter);

    assert_eq!(lifecycle.listener_count(), 0);
}

// =============================================================================
// CATEGORIES, SOURCE ORDER, NAMES
// =============================================================================

#[test]
fn test_types_before_anonymous_before_members() {
    let db = world();
    db.add_type(TypeDef::new("p.A$1", UNIT_A).anonymous());
    db.add_type(TypeDef::new("p.A$2", UNIT_A).anonymous());
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, true, false);

    let nodes = vec![
        member(method("p.A", "foo")),
        type_node("p.A$2"),
        type_node("p.C"),
        type_node("p.A$1"),
        type_node("p.B"),
    ];

    // Anonymous types keep their relative order.
    assert_eq!(
        sorted(&sorter, nodes),
        vec!["p.B", "p.C", "p.A$2", "p.A$1", "p.A#foo"]
    );
}

#[test]
fn test_source_order_without_options() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, false, false);

    let mut members: Vec<HierarchyNode> = db
        .members(&type_id("p.A"))
        .unwrap()
        .into_iter()
        .map(HierarchyNode::Member)
        .collect();
    members.reverse();
    assert_eq!(sorted(&sorter, members), vec!["p.A#foo", "p.A#bar"]);

    let types = vec![type_node("p.A$Inner"), type_node("p.A")];
    assert_eq!(sorted(&sorter, types), vec!["p.A", "p.A$Inner"]);
}

#[rstest]
#[case(&["p.Zeta", "p.alpha", "p.Beta"], &["p.alpha", "p.Beta", "p.Zeta"])]
#[case(&["p.b", "p.B", "p.a"], &["p.a", "p.B", "p.b"])]
fn test_alphabetic_types(#[case] input: &[&str], #[case] expected: &[&str]) {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let sorter = sorter(&lifecycle, true, false);

    let nodes = input
        .iter()
        .map(|name| HierarchyNode::Type(TypeId::new(*name)))
        .collect();

    assert_eq!(sorted(&sorter, nodes), expected);
}

#[test]
fn test_view_sorter_uses_configured_order() {
    let db = world();
    let lifecycle = focused(&db, "p.A");
    let config = HierarchyConfig::default().with_sort(SortOrder::ALPHABETIC);
    let view = HierarchyView::new(lifecycle.clone(), ViewPolicy::Subtype, config);

    let mut children = view.children(&type_node("p.A"));
    children.reverse();
    view.sorter().sort(&mut children);

    assert_eq!(view.sorter().order(), SortOrder::ALPHABETIC);
    assert_eq!(names(&children), vec!["p.B", "p.C"]);
}
