//! Ordering of sibling nodes.

use std::cmp::Ordering;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::content::HierarchyNode;
use crate::base::{Member, TypeId};
use crate::config::SortOrder;
use crate::hierarchy::{HierarchyLifecycle, ListenerId, ResolverCache, is_supertype};
use crate::model::TypeInfo;

/// Sort category; lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Type,
    AnonymousType,
    Member,
}

/// Orders siblings of a hierarchy tree.
///
/// Cached override resolvers are dropped on every lifecycle event, so
/// defining-type ordering follows member edits.
pub struct HierarchySorter {
    lifecycle: Arc<HierarchyLifecycle>,
    order: SortOrder,
    resolvers: Arc<Mutex<ResolverCache>>,
    listener: ListenerId,
}

impl HierarchySorter {
    pub fn new(lifecycle: Arc<HierarchyLifecycle>, order: SortOrder) -> Self {
        let resolvers = Arc::new(Mutex::new(ResolverCache::default()));
        let weak: Weak<Mutex<ResolverCache>> = Arc::downgrade(&resolvers);
        let listener = lifecycle.add_change_listener(move |_event| {
            if let Some(resolvers) = weak.upgrade() {
                resolvers.lock().clear();
            }
        });
        Self {
            lifecycle,
            order,
            resolvers,
            listener,
        }
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Stable sort of `nodes`.
    pub fn sort(&self, nodes: &mut [HierarchyNode]) {
        nodes.sort_by(|a, b| self.compare(a, b));
    }

    pub fn compare(&self, a: &HierarchyNode, b: &HierarchyNode) -> Ordering {
        let (cat_a, cat_b) = (self.category(a), self.category(b));
        if cat_a != cat_b {
            return cat_a.cmp(&cat_b);
        }
        if cat_a == Category::AnonymousType {
            return Ordering::Equal;
        }

        if !self.order.alphabetic && !self.order.by_defining_type {
            return self.offset(a).cmp(&self.offset(b));
        }

        if self.order.by_defining_type {
            if let (HierarchyNode::Member(ma), HierarchyNode::Member(mb)) = (a, b) {
                let ordering = self.compare_defining_types(ma, mb);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }

        if self.order.alphabetic {
            compare_names(name(a), name(b))
        } else {
            Ordering::Equal
        }
    }

    /// Members that override something sort before members that do not;
    /// among overriding members, the one whose defining type is deeper in the
    /// hierarchy sorts first.
    fn compare_defining_types(&self, a: &Member, b: &Member) -> Ordering {
        match (self.defining_type(a), self.defining_type(b)) {
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(def_a), Some(def_b)) if def_a != def_b => {
                let Some(snapshot) = self.lifecycle.snapshot() else {
                    return Ordering::Equal;
                };
                if is_supertype(snapshot.as_ref(), &def_a, &def_b) {
                    Ordering::Greater
                } else if is_supertype(snapshot.as_ref(), &def_b, &def_a) {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            }
            _ => Ordering::Equal,
        }
    }

    fn defining_type(&self, member: &Member) -> Option<TypeId> {
        if !member.is_inheritable() {
            return None;
        }
        let snapshot = self.lifecycle.snapshot()?;
        let resolver = self.resolvers.lock().resolver(
            self.lifecycle.generation(),
            self.lifecycle.database(),
            &snapshot,
            &member.declaring_type,
        );
        resolver.find_defining_type(member)
    }

    fn category(&self, node: &HierarchyNode) -> Category {
        match node {
            HierarchyNode::Member(_) => Category::Member,
            HierarchyNode::Type(ty) => match self.type_info(ty) {
                Some(info) if info.anonymous => Category::AnonymousType,
                _ => Category::Type,
            },
        }
    }

    fn offset(&self, node: &HierarchyNode) -> u32 {
        match node {
            HierarchyNode::Member(member) => member.offset,
            HierarchyNode::Type(ty) => self.type_info(ty).map_or(0, |info| info.offset),
        }
    }

    fn type_info(&self, ty: &TypeId) -> Option<TypeInfo> {
        match self.lifecycle.database().type_info(ty) {
            Ok(info) => Some(info),
            Err(err) => {
                tracing::debug!("[SORTER] No type info for {}: {}", ty, err);
                None
            }
        }
    }
}

impl Drop for HierarchySorter {
    fn drop(&mut self) {
        self.lifecycle.remove_change_listener(self.listener);
    }
}

fn name(node: &HierarchyNode) -> &str {
    match node {
        HierarchyNode::Type(ty) => ty.simple_name(),
        HierarchyNode::Member(member) => member.name.as_str(),
    }
}

/// Case-insensitive first, case-sensitive to break ties.
fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}
