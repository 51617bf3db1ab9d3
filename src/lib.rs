//! # typehier-base
//!
//! Incrementally refreshed type hierarchy cache with supertype, subtype and
//! traditional traversal policies and override-aware member filtering.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! view       → Tree content per policy, member filters, sibling ordering
//!   ↓
//! hierarchy  → Lifecycle (rebuild / refresh), change deltas, override resolution
//!   ↓
//! model      → Symbol database boundary, change events, in-memory database
//!   ↓
//! base       → Primitives (TypeId, Container, Member, Modifiers)
//! ```
//!
//! `config` holds the settings shared by the upper layers.

// ============================================================================
// MODULES (dependency order: base → model → hierarchy → view)
// ============================================================================

/// Foundation types: type and container handles, members
pub mod base;

/// Symbol database boundary and the in-memory implementation
pub mod model;

/// Shared hierarchy cache: lifecycle, deltas, overrides
pub mod hierarchy;

/// Tree views: policies, member filters, sorting
pub mod view;

/// Lifecycle and view settings
pub mod config;

// Re-export foundation types
pub use base::{Container, ContainerId, ContainerKind, Member, MemberKind, Modifiers, TypeId};

pub use config::{HierarchyConfig, SortOrder};
pub use hierarchy::{
    ChangeDeltaProcessor, ChangedTypes, HierarchyError, HierarchyEvent, HierarchyLifecycle,
    HierarchyResult, InputScope, OverrideResolver, RefreshOutcome, WorkingSet,
};
pub use model::{HierarchyMode, HierarchySnapshot, MemoryDatabase, SymbolDatabase};
pub use view::{ExpandLevel, HierarchyNode, HierarchySorter, HierarchyView, MemberFilter, ViewPolicy};
