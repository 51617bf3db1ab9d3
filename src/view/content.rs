//! Tree content over a shared hierarchy.
//!
//! A [`HierarchyView`] turns the lifecycle's snapshot into a tree of
//! [`HierarchyNode`]s for one [`ViewPolicy`]. Every type it hands out passes
//! `is_in_tree`: the type is in scope and matches the member filter, or some
//! type below it in the policy's direction does.
//!
//! Visibility answers are memoized until the lifecycle generation or the
//! view's own settings change, or until the lifecycle reports a change.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;

use super::filter::MemberFilter;
use super::policy::{ExpandLevel, ViewPolicy};
use super::sorter::HierarchySorter;
use crate::base::{Member, TypeId};
use crate::config::HierarchyConfig;
use crate::hierarchy::{
    HierarchyLifecycle, HierarchyResult, InputScope, ListenerId, OverrideResolver,
    RefreshOutcome, ResolverCache, ScopeFilter, WorkingSet, is_supertype,
};
use crate::model::HierarchySnapshot;

/// A node of a hierarchy tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HierarchyNode {
    Type(TypeId),
    Member(Member),
}

impl HierarchyNode {
    pub fn as_type(&self) -> Option<&TypeId> {
        match self {
            Self::Type(ty) => Some(ty),
            Self::Member(_) => None,
        }
    }

    pub fn as_member(&self) -> Option<&Member> {
        match self {
            Self::Type(_) => None,
            Self::Member(member) => Some(member),
        }
    }
}

impl From<TypeId> for HierarchyNode {
    fn from(ty: TypeId) -> Self {
        Self::Type(ty)
    }
}

impl From<Member> for HierarchyNode {
    fn from(member: Member) -> Self {
        Self::Member(member)
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Default)]
struct ViewSettings {
    filter: Option<Arc<MemberFilter>>,
    working_set: Option<WorkingSet>,
    generation: u64,
}

/// (lifecycle generation, view settings generation)
type CacheKey = (u64, u64);

#[derive(Default)]
struct ViewCaches {
    key: Option<CacheKey>,
    scope: Arc<ScopeFilter>,
    visibility: FxHashMap<TypeId, bool>,
    resolvers: ResolverCache,
}

impl ViewCaches {
    fn invalidate(&mut self) {
        self.key = None;
        self.visibility.clear();
        self.resolvers.clear();
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// Tree data source for one traversal policy.
pub struct HierarchyView {
    lifecycle: Arc<HierarchyLifecycle>,
    policy: ViewPolicy,
    config: HierarchyConfig,
    settings: RwLock<ViewSettings>,
    caches: Arc<Mutex<ViewCaches>>,
    listener: ListenerId,
}

impl HierarchyView {
    pub fn new(lifecycle: Arc<HierarchyLifecycle>, policy: ViewPolicy, config: HierarchyConfig) -> Self {
        let caches = Arc::new(Mutex::new(ViewCaches::default()));
        let weak: Weak<Mutex<ViewCaches>> = Arc::downgrade(&caches);
        let listener = lifecycle.add_change_listener(move |_event| {
            if let Some(caches) = weak.upgrade() {
                caches.lock().invalidate();
            }
        });
        Self {
            lifecycle,
            policy,
            config,
            settings: RwLock::new(ViewSettings::default()),
            caches,
            listener,
        }
    }

    pub fn policy(&self) -> ViewPolicy {
        self.policy
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &Arc<HierarchyLifecycle> {
        &self.lifecycle
    }

    /// A sorter over the same lifecycle using the configured order.
    pub fn sorter(&self) -> HierarchySorter {
        HierarchySorter::new(self.lifecycle.clone(), self.config.sort)
    }

    // ==================== Settings ====================

    /// Set or clear the member filter.
    pub fn set_member_filter(&self, filter: Option<MemberFilter>) {
        let mut settings = self.settings.write();
        settings.filter = filter.map(Arc::new);
        settings.generation += 1;
    }

    pub fn member_filter(&self) -> Option<MemberFilter> {
        self.settings.read().filter.as_deref().cloned()
    }

    pub fn set_working_set(&self, working_set: Option<WorkingSet>) {
        let mut settings = self.settings.write();
        settings.working_set = working_set;
        settings.generation += 1;
    }

    /// Point the shared lifecycle at `scope` and drop the member filter.
    pub fn set_scope(
        &self,
        scope: &InputScope,
        cancel: &CancellationToken,
    ) -> HierarchyResult<RefreshOutcome> {
        let outcome = self.lifecycle.ensure_refreshed(scope, cancel)?;
        self.set_member_filter(None);
        Ok(outcome)
    }

    pub fn expand_level(&self) -> ExpandLevel {
        let snapshot = self.lifecycle.snapshot();
        self.policy.expand_level(snapshot.as_deref())
    }

    // ==================== Tree ====================

    pub fn roots(&self) -> Vec<HierarchyNode> {
        let Some(query) = self.query() else {
            return Vec::new();
        };
        self.policy
            .root_types(query.snapshot.as_ref(), &self.config)
            .into_iter()
            .filter(|ty| query.is_in_tree(ty))
            .map(HierarchyNode::Type)
            .collect()
    }

    /// Filtered members first, then visible type children.
    pub fn children(&self, node: &HierarchyNode) -> Vec<HierarchyNode> {
        let HierarchyNode::Type(ty) = node else {
            return Vec::new();
        };
        let Some(query) = self.query() else {
            return Vec::new();
        };
        let mut children: Vec<HierarchyNode> = query
            .member_children(ty)
            .into_iter()
            .map(HierarchyNode::Member)
            .collect();
        children.extend(
            query
                .type_children(ty)
                .into_iter()
                .filter(|child| query.is_in_tree(child))
                .map(HierarchyNode::Type),
        );
        children
    }

    pub fn has_children(&self, node: &HierarchyNode) -> bool {
        let HierarchyNode::Type(ty) = node else {
            return false;
        };
        let Some(query) = self.query() else {
            return false;
        };
        if query.type_children(ty).iter().any(|child| query.is_in_tree(child)) {
            return true;
        }
        query.filter.is_some() && !query.member_children(ty).is_empty()
    }

    pub fn parent(&self, node: &HierarchyNode) -> Option<HierarchyNode> {
        match node {
            HierarchyNode::Member(member) => Some(HierarchyNode::Type(member.declaring_type.clone())),
            HierarchyNode::Type(ty) => {
                let snapshot = self.lifecycle.snapshot()?;
                self.policy
                    .type_parent(snapshot.as_ref(), ty)
                    .map(HierarchyNode::Type)
            }
        }
    }

    /// Whether `ty` is in the current scope and working set.
    pub fn is_in_scope(&self, ty: &TypeId) -> bool {
        self.query()
            .is_some_and(|query| query.scope.admits(self.lifecycle.database().as_ref(), ty))
    }

    /// Whether `ty` appears in the tree.
    pub fn is_in_tree(&self, ty: &TypeId) -> bool {
        self.query().is_some_and(|query| query.is_in_tree(ty))
    }

    fn query(&self) -> Option<Query<'_>> {
        let snapshot = self.lifecycle.snapshot()?;
        let (filter, working_set, view_generation) = {
            let settings = self.settings.read();
            (
                settings.filter.clone(),
                settings.working_set.clone(),
                settings.generation,
            )
        };
        let key = (self.lifecycle.generation(), view_generation);

        let scope = {
            let mut caches = self.caches.lock();
            if caches.key != Some(key) {
                caches.invalidate();
                caches.scope = Arc::new(ScopeFilter::new(
                    self.lifecycle.database().as_ref(),
                    self.lifecycle.input_scope().as_ref(),
                    working_set,
                ));
                caches.key = Some(key);
            }
            caches.scope.clone()
        };

        Some(Query {
            view: self,
            snapshot,
            key,
            filter,
            scope,
        })
    }
}

impl Drop for HierarchyView {
    fn drop(&mut self) {
        self.lifecycle.remove_change_listener(self.listener);
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// Consistent inputs for one tree request.
struct Query<'v> {
    view: &'v HierarchyView,
    snapshot: Arc<dyn HierarchySnapshot>,
    key: CacheKey,
    filter: Option<Arc<MemberFilter>>,
    scope: Arc<ScopeFilter>,
}

impl Query<'_> {
    fn type_children(&self, ty: &TypeId) -> Vec<TypeId> {
        self.view.policy.type_children(self.snapshot.as_ref(), ty)
    }

    fn is_in_tree(&self, ty: &TypeId) -> bool {
        self.is_in_tree_guarded(ty, &mut FxHashSet::default())
    }

    fn is_in_tree_guarded(&self, ty: &TypeId, in_progress: &mut FxHashSet<TypeId>) -> bool {
        let cached = self.view.caches.lock().visibility.get(ty).copied();
        if let Some(visible) = cached {
            return visible;
        }
        if !in_progress.insert(ty.clone()) {
            return false;
        }

        let visible = self.is_directly_visible(ty)
            || self
                .type_children(ty)
                .iter()
                .any(|child| self.is_in_tree_guarded(child, in_progress));
        in_progress.remove(ty);

        let mut caches = self.view.caches.lock();
        if caches.key == Some(self.key) {
            caches.visibility.insert(ty.clone(), visible);
        }
        visible
    }

    fn is_directly_visible(&self, ty: &TypeId) -> bool {
        if !self.scope.admits(self.view.lifecycle.database().as_ref(), ty) {
            return false;
        }
        match &self.filter {
            None => true,
            Some(filter) => {
                filter.declared_by(ty).next().is_some()
                    || filter
                        .iter()
                        .any(|member| self.compatible_member(ty, member).is_some())
            }
        }
    }

    /// Filtered members `ty` declares, then its methods compatible with
    /// filtered methods of other types.
    fn member_children(&self, ty: &TypeId) -> Vec<Member> {
        let Some(filter) = &self.filter else {
            return Vec::new();
        };
        let mut members: Vec<Member> = Vec::new();
        for member in filter.iter() {
            let found = if &member.declaring_type == ty {
                self.resolver(ty)
                    .find_declared_member(ty, member)
                    .or_else(|| Some(member.clone()))
            } else {
                self.compatible_member(ty, member)
            };
            if let Some(found) = found {
                if !members.contains(&found) {
                    members.push(found);
                }
            }
        }
        members
    }

    /// The method of `candidate` that overrides, or is overridden by, the
    /// filtered method `member`.
    fn compatible_member(&self, candidate: &TypeId, member: &Member) -> Option<Member> {
        if !member.is_inheritable() {
            return None;
        }
        let declaring = &member.declaring_type;
        if is_supertype(self.snapshot.as_ref(), candidate, declaring) {
            self.resolver(declaring)
                .find_overridden_method_in_type(candidate, member)
        } else {
            self.resolver(candidate)
                .find_overriding_method_in_type(candidate, member)
        }
    }

    fn resolver(&self, focus: &TypeId) -> Arc<OverrideResolver> {
        self.view.caches.lock().resolvers.resolver(
            self.key.0,
            self.view.lifecycle.database(),
            &self.snapshot,
            focus,
        )
    }
}
