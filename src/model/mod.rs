//! Symbol database boundary.
//!
//! The hierarchy engine does not parse source or compute hierarchies itself.
//! It consumes a [`SymbolDatabase`] that can build [`HierarchySnapshot`]s,
//! answer element queries, and stream [`ModelEvent`]s to a subscribed sink.
//!
//! [`MemoryDatabase`] is a complete in-process implementation used by tests
//! and by embedders that already hold their model in memory.

mod delta;
mod memory;

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::base::{Container, ContainerId, Member, Modifiers, TypeId};

pub use delta::{ChangeEvent, DeltaElement, DeltaFlags, DeltaKind};
pub use memory::{MemoryDatabase, MemorySnapshot, TypeDef};

// ============================================================================
// ERRORS
// ============================================================================

/// Failure reported by the symbol database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The element does not exist (anymore).
    #[error("Element does not exist: {0}")]
    NotFound(String),

    /// The operation observed its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// Any other engine failure.
    #[error("Model error: {0}")]
    Engine(String),
}

impl ModelError {
    pub fn not_found(element: impl std::fmt::Display) -> Self {
        Self::NotFound(element.to_string())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}

// ============================================================================
// BUILD REQUESTS
// ============================================================================

/// How much of a single type's hierarchy to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HierarchyMode {
    /// Only the superclass chain of the focus type.
    SupertypesOnly,
    /// The superclass chain plus all transitive subtypes of the focus type.
    #[default]
    Full,
}

/// What a snapshot should be computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildRequest {
    Type { focus: TypeId, mode: HierarchyMode },
    /// Every type declared under the containers, plus their supertypes.
    Region { containers: Vec<ContainerId> },
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// A computed hierarchy graph.
///
/// Snapshots are shared read-only between consumers. `refresh` re-derives
/// the graph in place; implementations must swap the new graph in as a whole
/// so readers never observe a partially refreshed state.
pub trait HierarchySnapshot: Send + Sync {
    /// The type the snapshot was computed for, `None` for regions.
    fn focus_type(&self) -> Option<TypeId>;

    fn superclass(&self, ty: &TypeId) -> Option<TypeId>;

    fn subclasses(&self, ty: &TypeId) -> Vec<TypeId>;

    fn root_classes(&self) -> Vec<TypeId>;

    fn contains(&self, ty: &TypeId) -> bool;

    /// Modifiers recorded for the type when the snapshot was computed.
    fn cached_flags(&self, ty: &TypeId) -> Option<Modifiers>;

    /// Recompute the graph for the same request.
    fn refresh(&self, cancel: &CancellationToken) -> Result<(), ModelError>;

    /// Whether the element the snapshot was computed for still exists.
    fn exists(&self) -> bool;

    /// Number of types in the graph.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Notification pushed by the database to a subscribed sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// Elements changed; the tree describes what.
    Changed(ChangeEvent),
    /// Hierarchies computed before this point may be structurally out of date.
    HierarchyStale,
}

/// Receiver of [`ModelEvent`]s. May be called from any thread.
pub trait ModelEventSink: Send + Sync {
    fn notify(&self, event: &ModelEvent);
}

/// Token returned by [`SymbolDatabase::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

// ============================================================================
// DATABASE
// ============================================================================

/// Per-type attributes needed for ordering and labelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub id: TypeId,
    pub anonymous: bool,
    pub modifiers: Modifiers,
    /// Offset of the declaration in its unit.
    pub offset: u32,
    pub unit: ContainerId,
}

/// The symbol database the engine is built against.
pub trait SymbolDatabase: Send + Sync {
    /// Compute a new snapshot.
    fn build_hierarchy(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn HierarchySnapshot>, ModelError>;

    fn exists(&self, ty: &TypeId) -> bool;

    fn type_info(&self, ty: &TypeId) -> Result<TypeInfo, ModelError>;

    /// Members declared directly by the type, in declaration order.
    fn members(&self, ty: &TypeId) -> Result<Vec<Member>, ModelError>;

    /// Containers enclosing the type, nearest first (unit ... project).
    fn ancestors(&self, ty: &TypeId) -> Result<Vec<Container>, ModelError>;

    fn container(&self, id: &ContainerId) -> Result<Container, ModelError>;

    /// Direct child containers.
    fn child_containers(&self, id: &ContainerId) -> Result<Vec<Container>, ModelError>;

    /// All types declared in a unit, nested types included.
    fn types_in_unit(&self, unit: &ContainerId) -> Result<Vec<TypeId>, ModelError>;

    /// Whether `method` has the same signature as `other` for override
    /// purposes. The default compares names and parameter types.
    fn is_subsignature(&self, method: &Member, other: &Member) -> bool {
        method.is_method()
            && other.is_method()
            && method.name == other.name
            && method.parameters == other.parameters
    }

    fn subscribe(&self, sink: Arc<dyn ModelEventSink>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}
