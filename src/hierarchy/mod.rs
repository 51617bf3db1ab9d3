//! Hierarchy cache layer.
//!
//! [`HierarchyLifecycle`] owns the shared snapshot and keeps it current,
//! [`ChangeDeltaProcessor`] maps change trees to affected types, and
//! [`OverrideResolver`] answers override questions over a snapshot.

mod delta;
mod error;
mod events;
mod lifecycle;
mod overrides;
mod scope;

pub use delta::{ChangeDeltaProcessor, ChangedTypes};
pub use error::{HierarchyError, HierarchyResult};
pub use events::{ChangeListener, HierarchyEvent, ListenerId};
pub use lifecycle::{HierarchyLifecycle, RefreshOutcome};
pub use overrides::{OverrideResolver, is_supertype};
pub use scope::{InputScope, WorkingSet};

pub(crate) use overrides::ResolverCache;
pub(crate) use scope::ScopeFilter;
