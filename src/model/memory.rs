//! In-memory symbol database.
//!
//! Holds containers, types and members in insertion-ordered maps and computes
//! hierarchies on demand. Mutations that change the shape of the inheritance
//! graph broadcast [`ModelEvent::HierarchyStale`]; finer edits are reported by
//! the caller through [`MemoryDatabase::notify`] with a delta built by
//! [`MemoryDatabase::unit_delta`] or [`MemoryDatabase::delta_under`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{
    BuildRequest, ChangeEvent, DeltaElement, DeltaFlags, HierarchyMode, HierarchySnapshot,
    ModelError, ModelEvent, ModelEventSink, SubscriptionId, SymbolDatabase, TypeInfo,
};
use crate::base::{Container, ContainerId, ContainerKind, Member, Modifiers, TypeId};

// ============================================================================
// TYPE DEFINITIONS
// ============================================================================

/// Declaration of a type to insert into a [`MemoryDatabase`].
#[derive(Debug, Clone)]
pub struct TypeDef {
    id: TypeId,
    unit: ContainerId,
    superclass: Option<TypeId>,
    members: Vec<Member>,
    anonymous: bool,
    modifiers: Modifiers,
    offset: u32,
}

impl TypeDef {
    /// A type named `qualified_name` declared in `unit`.
    pub fn new(qualified_name: &str, unit: &str) -> Self {
        Self {
            id: TypeId::new(qualified_name),
            unit: ContainerId::new(unit),
            superclass: None,
            members: Vec::new(),
            anonymous: false,
            modifiers: Modifiers::empty(),
            offset: 0,
        }
    }

    /// A type nested in `outer`, declared in the same unit.
    pub fn nested(outer: &TypeDef, simple_name: &str) -> Self {
        let name = format!("{}${}", outer.id.qualified_name(), simple_name);
        Self::new(&name, outer.unit.as_str())
    }

    pub fn id(&self) -> &TypeId {
        &self.id
    }

    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(TypeId::new(superclass));
        self
    }

    /// Declare a method; offsets follow declaration order.
    pub fn method(self, name: &str, parameters: &[&str]) -> Self {
        let member = Member::method(self.id.clone(), name, parameters);
        self.member(member)
    }

    pub fn member(mut self, member: Member) -> Self {
        let offset = self.offset + 10 * (self.members.len() as u32 + 1);
        self.members.push(member.at(offset));
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

// ============================================================================
// MODEL STATE
// ============================================================================

#[derive(Debug)]
struct ContainerEntry {
    container: Container,
    parent: Option<ContainerId>,
}

#[derive(Debug)]
struct TypeEntry {
    unit: ContainerId,
    superclass: Option<TypeId>,
    members: Vec<Member>,
    anonymous: bool,
    modifiers: Modifiers,
    offset: u32,
}

#[derive(Debug, Default)]
struct ModelState {
    containers: IndexMap<ContainerId, ContainerEntry>,
    types: IndexMap<TypeId, TypeEntry>,
    failing_units: FxHashSet<ContainerId>,
    failing_types: FxHashSet<TypeId>,
    fail_builds: bool,
}

impl ModelState {
    /// Superclass of `ty` if it names a type that exists.
    fn superclass_of(&self, ty: &TypeId) -> Option<TypeId> {
        let sup = self.types.get(ty)?.superclass.as_ref()?;
        self.types.contains_key(sup).then(|| sup.clone())
    }

    /// Container chain starting at `id`, innermost first.
    fn enclosing(&self, id: &ContainerId) -> Vec<&Container> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            let Some(entry) = self.containers.get(cid) else {
                break;
            };
            if chain.iter().any(|c: &&Container| &c.id == cid) {
                break;
            }
            chain.push(&entry.container);
            current = entry.parent.as_ref();
        }
        chain
    }

    fn subtype_index(&self) -> FxHashMap<TypeId, Vec<TypeId>> {
        let mut index: FxHashMap<TypeId, Vec<TypeId>> = FxHashMap::default();
        for ty in self.types.keys() {
            if let Some(sup) = self.superclass_of(ty) {
                index.entry(sup).or_default().push(ty.clone());
            }
        }
        index
    }

    fn check_type(&self, ty: &TypeId) -> Result<&TypeEntry, ModelError> {
        if self.failing_types.contains(ty) {
            return Err(ModelError::engine(format!("cannot read type {ty}")));
        }
        self.types.get(ty).ok_or_else(|| ModelError::not_found(ty))
    }
}

#[derive(Debug, Default)]
struct Counters {
    builds: AtomicUsize,
    refreshes: AtomicUsize,
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), ModelError> {
    if cancel.is_cancelled() {
        Err(ModelError::Cancelled)
    } else {
        Ok(())
    }
}

// ============================================================================
// HIERARCHY GRAPH
// ============================================================================

#[derive(Debug, Default)]
struct HierarchyGraph {
    focus: Option<TypeId>,
    types: IndexSet<TypeId>,
    superclass: FxHashMap<TypeId, TypeId>,
    subclasses: FxHashMap<TypeId, Vec<TypeId>>,
    flags: FxHashMap<TypeId, Modifiers>,
}

impl HierarchyGraph {
    fn compute(
        state: &ModelState,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<Self, ModelError> {
        check_cancel(cancel)?;
        if state.fail_builds {
            return Err(ModelError::engine("hierarchy computation failed"));
        }

        let mut graph = Self::default();
        match request {
            BuildRequest::Type { focus, mode } => {
                if !state.types.contains_key(focus) {
                    return Err(ModelError::not_found(focus));
                }
                graph.focus = Some(focus.clone());
                graph.add_supertype_chain(state, focus, cancel)?;
                if *mode == HierarchyMode::Full {
                    graph.add_subtypes(state, focus, cancel)?;
                }
            }
            BuildRequest::Region { containers } => {
                let region: FxHashSet<&ContainerId> = containers.iter().collect();
                for (ty, entry) in &state.types {
                    check_cancel(cancel)?;
                    let in_region = state
                        .enclosing(&entry.unit)
                        .iter()
                        .any(|c| region.contains(&c.id));
                    if in_region {
                        graph.add_supertype_chain(state, ty, cancel)?;
                    }
                }
            }
        }
        Ok(graph)
    }

    fn insert(&mut self, state: &ModelState, ty: &TypeId) {
        if self.types.insert(ty.clone()) {
            let modifiers = state
                .types
                .get(ty)
                .map(|entry| entry.modifiers)
                .unwrap_or_default();
            self.flags.insert(ty.clone(), modifiers);
        }
    }

    fn link(&mut self, sub: &TypeId, sup: &TypeId) {
        self.superclass.insert(sub.clone(), sup.clone());
        let subs = self.subclasses.entry(sup.clone()).or_default();
        if !subs.contains(sub) {
            subs.push(sub.clone());
        }
    }

    fn add_supertype_chain(
        &mut self,
        state: &ModelState,
        start: &TypeId,
        cancel: &CancellationToken,
    ) -> Result<(), ModelError> {
        let mut seen = FxHashSet::default();
        let mut current = start.clone();
        loop {
            check_cancel(cancel)?;
            self.insert(state, &current);
            seen.insert(current.clone());
            if self.superclass.contains_key(&current) {
                break;
            }
            let Some(sup) = state.superclass_of(&current) else {
                break;
            };
            if seen.contains(&sup) {
                trace!("[MEMORY_DB] superclass cycle at {}", current);
                break;
            }
            self.link(&current, &sup);
            current = sup;
        }
        Ok(())
    }

    fn add_subtypes(
        &mut self,
        state: &ModelState,
        focus: &TypeId,
        cancel: &CancellationToken,
    ) -> Result<(), ModelError> {
        let index = state.subtype_index();
        let mut visited: FxHashSet<TypeId> = FxHashSet::default();
        visited.insert(focus.clone());
        let mut queue = vec![focus.clone()];
        while let Some(ty) = queue.pop() {
            check_cancel(cancel)?;
            for sub in index.get(&ty).into_iter().flatten() {
                if visited.insert(sub.clone()) {
                    self.insert(state, sub);
                    self.link(sub, &ty);
                    queue.push(sub.clone());
                }
            }
        }
        Ok(())
    }

    fn root_classes(&self) -> Vec<TypeId> {
        self.types
            .iter()
            .filter(|ty| !self.superclass.contains_key(*ty))
            .cloned()
            .collect()
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Snapshot produced by [`MemoryDatabase`].
pub struct MemorySnapshot {
    state: Arc<RwLock<ModelState>>,
    request: BuildRequest,
    graph: RwLock<HierarchyGraph>,
    counters: Arc<Counters>,
}

impl MemorySnapshot {
    pub fn request(&self) -> &BuildRequest {
        &self.request
    }
}

impl HierarchySnapshot for MemorySnapshot {
    fn focus_type(&self) -> Option<TypeId> {
        self.graph.read().focus.clone()
    }

    fn superclass(&self, ty: &TypeId) -> Option<TypeId> {
        self.graph.read().superclass.get(ty).cloned()
    }

    fn subclasses(&self, ty: &TypeId) -> Vec<TypeId> {
        self.graph
            .read()
            .subclasses
            .get(ty)
            .cloned()
            .unwrap_or_default()
    }

    fn root_classes(&self) -> Vec<TypeId> {
        self.graph.read().root_classes()
    }

    fn contains(&self, ty: &TypeId) -> bool {
        self.graph.read().types.contains(ty)
    }

    fn cached_flags(&self, ty: &TypeId) -> Option<Modifiers> {
        self.graph.read().flags.get(ty).copied()
    }

    fn refresh(&self, cancel: &CancellationToken) -> Result<(), ModelError> {
        let graph = HierarchyGraph::compute(&self.state.read(), &self.request, cancel)?;
        *self.graph.write() = graph;
        self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn exists(&self) -> bool {
        let state = self.state.read();
        match &self.request {
            BuildRequest::Type { focus, .. } => state.types.contains_key(focus),
            BuildRequest::Region { containers } => {
                containers.iter().all(|c| state.containers.contains_key(c))
            }
        }
    }

    fn len(&self) -> usize {
        self.graph.read().types.len()
    }
}

// ============================================================================
// DATABASE
// ============================================================================

/// A [`SymbolDatabase`] held entirely in memory.
pub struct MemoryDatabase {
    state: Arc<RwLock<ModelState>>,
    sinks: Mutex<Vec<(SubscriptionId, Arc<dyn ModelEventSink>)>>,
    next_subscription: AtomicU64,
    counters: Arc<Counters>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ModelState::default())),
            sinks: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            counters: Arc::new(Counters::default()),
        }
    }

    // ==================== Population ====================

    /// Add a container below `parent` (or at the top level).
    pub fn add_container(&self, container: Container, parent: Option<&str>) {
        let entry = ContainerEntry {
            parent: parent.map(ContainerId::new),
            container,
        };
        self.state
            .write()
            .containers
            .insert(entry.container.id.clone(), entry);
    }

    /// Add or replace a type.
    pub fn add_type(&self, def: TypeDef) {
        let entry = TypeEntry {
            unit: def.unit,
            superclass: def.superclass,
            members: def.members,
            anonymous: def.anonymous,
            modifiers: def.modifiers,
            offset: def.offset,
        };
        self.state.write().types.insert(def.id, entry);
    }

    /// Append a member to its declaring type. Returns false if the type is unknown.
    pub fn add_member(&self, member: Member) -> bool {
        let mut state = self.state.write();
        match state.types.get_mut(&member.declaring_type) {
            Some(entry) => {
                entry.members.push(member);
                true
            }
            None => false,
        }
    }

    // ==================== Structural edits ====================

    /// Change a type's superclass and broadcast [`ModelEvent::HierarchyStale`].
    pub fn set_superclass(&self, ty: &TypeId, superclass: Option<&str>) -> bool {
        let changed = {
            let mut state = self.state.write();
            match state.types.get_mut(ty) {
                Some(entry) => {
                    entry.superclass = superclass.map(TypeId::new);
                    true
                }
                None => false,
            }
        };
        if changed {
            self.notify(&ModelEvent::HierarchyStale);
        }
        changed
    }

    /// Remove a type and broadcast [`ModelEvent::HierarchyStale`].
    pub fn remove_type(&self, ty: &TypeId) -> bool {
        let removed = self.state.write().types.shift_remove(ty).is_some();
        if removed {
            self.notify(&ModelEvent::HierarchyStale);
        }
        removed
    }

    // ==================== Failure injection ====================

    /// Make `types_in_unit` fail for the unit.
    pub fn fail_unit(&self, unit: &str, failing: bool) {
        let mut state = self.state.write();
        let id = ContainerId::new(unit);
        if failing {
            state.failing_units.insert(id);
        } else {
            state.failing_units.remove(&id);
        }
    }

    /// Make per-type queries (`members`, `type_info`, `ancestors`) fail.
    pub fn fail_type(&self, ty: &TypeId, failing: bool) {
        let mut state = self.state.write();
        if failing {
            state.failing_types.insert(ty.clone());
        } else {
            state.failing_types.remove(ty);
        }
    }

    /// Make hierarchy builds and refreshes fail.
    pub fn fail_builds(&self, failing: bool) {
        self.state.write().fail_builds = failing;
    }

    // ==================== Events ====================

    /// Deliver an event to every subscribed sink.
    ///
    /// Sinks are called without any database lock held, so they may query
    /// the database.
    pub fn notify(&self, event: &ModelEvent) {
        let sinks: Vec<Arc<dyn ModelEventSink>> =
            self.sinks.lock().iter().map(|(_, s)| s.clone()).collect();
        trace!("[MEMORY_DB] notify {} sink(s): {:?}", sinks.len(), event);
        for sink in sinks {
            sink.notify(event);
        }
    }

    /// Wrap `leaf` in deltas for `parent` and all containers above it, up to
    /// the model root.
    pub fn delta_under(
        &self,
        leaf: ChangeEvent,
        parent: &ContainerId,
    ) -> Result<ChangeEvent, ModelError> {
        let state = self.state.read();
        if !state.containers.contains_key(parent) {
            return Err(ModelError::not_found(parent));
        }
        let mut delta = leaf;
        for container in state.enclosing(parent) {
            let element = match container.kind {
                ContainerKind::Project => DeltaElement::Project(container.id.clone()),
                ContainerKind::SourceRoot => DeltaElement::SourceRoot(container.id.clone()),
                ContainerKind::Package => DeltaElement::Package(container.id.clone()),
                ContainerKind::Unit => DeltaElement::Unit {
                    unit: container.id.clone(),
                    primary: true,
                },
            };
            delta = delta.wrap(element);
        }
        Ok(delta.wrap(DeltaElement::Model))
    }

    /// A full delta tree for a `Changed` primary unit with `flags`.
    pub fn unit_delta(&self, unit: &str, flags: DeltaFlags) -> Result<ChangeEvent, ModelError> {
        let unit = ContainerId::new(unit);
        let parent = self
            .state
            .read()
            .containers
            .get(&unit)
            .ok_or_else(|| ModelError::not_found(&unit))?
            .parent
            .clone()
            .ok_or_else(|| ModelError::engine(format!("unit {unit} has no package")))?;
        let leaf = ChangeEvent::changed(
            DeltaElement::Unit {
                unit,
                primary: true,
            },
            flags,
        );
        self.delta_under(leaf, &parent)
    }

    // ==================== Statistics ====================

    /// Number of successful `build_hierarchy` calls.
    pub fn build_count(&self) -> usize {
        self.counters.builds.load(Ordering::Relaxed)
    }

    /// Number of successful in-place snapshot refreshes.
    pub fn refresh_count(&self) -> usize {
        self.counters.refreshes.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.lock().len()
    }
}

impl SymbolDatabase for MemoryDatabase {
    fn build_hierarchy(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn HierarchySnapshot>, ModelError> {
        let graph = HierarchyGraph::compute(&self.state.read(), request, cancel)?;
        self.counters.builds.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MemorySnapshot {
            state: self.state.clone(),
            request: request.clone(),
            graph: RwLock::new(graph),
            counters: self.counters.clone(),
        }))
    }

    fn exists(&self, ty: &TypeId) -> bool {
        self.state.read().types.contains_key(ty)
    }

    fn type_info(&self, ty: &TypeId) -> Result<TypeInfo, ModelError> {
        let state = self.state.read();
        let entry = state.check_type(ty)?;
        Ok(TypeInfo {
            id: ty.clone(),
            anonymous: entry.anonymous,
            modifiers: entry.modifiers,
            offset: entry.offset,
            unit: entry.unit.clone(),
        })
    }

    fn members(&self, ty: &TypeId) -> Result<Vec<Member>, ModelError> {
        let state = self.state.read();
        Ok(state.check_type(ty)?.members.clone())
    }

    fn ancestors(&self, ty: &TypeId) -> Result<Vec<Container>, ModelError> {
        let state = self.state.read();
        let entry = state.check_type(ty)?;
        Ok(state.enclosing(&entry.unit).into_iter().cloned().collect())
    }

    fn container(&self, id: &ContainerId) -> Result<Container, ModelError> {
        self.state
            .read()
            .containers
            .get(id)
            .map(|entry| entry.container.clone())
            .ok_or_else(|| ModelError::not_found(id))
    }

    fn child_containers(&self, id: &ContainerId) -> Result<Vec<Container>, ModelError> {
        let state = self.state.read();
        if !state.containers.contains_key(id) {
            return Err(ModelError::not_found(id));
        }
        Ok(state
            .containers
            .values()
            .filter(|entry| entry.parent.as_ref() == Some(id))
            .map(|entry| entry.container.clone())
            .collect())
    }

    fn types_in_unit(&self, unit: &ContainerId) -> Result<Vec<TypeId>, ModelError> {
        let state = self.state.read();
        if state.failing_units.contains(unit) {
            return Err(ModelError::engine(format!("cannot enumerate types of {unit}")));
        }
        if !state.containers.contains_key(unit) {
            return Err(ModelError::not_found(unit));
        }
        Ok(state
            .types
            .iter()
            .filter(|(_, entry)| &entry.unit == unit)
            .map(|(ty, _)| ty.clone())
            .collect())
    }

    fn subscribe(&self, sink: Arc<dyn ModelEventSink>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.sinks.lock().push((id, sink));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.sinks.lock().retain(|(sid, _)| *sid != id);
    }
}
