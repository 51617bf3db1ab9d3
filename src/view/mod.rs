//! Tree views over a hierarchy lifecycle.
//!
//! Several [`HierarchyView`]s may share one lifecycle and its snapshot; each
//! keeps its own member filter, working set and caches.

mod content;
mod filter;
mod policy;
mod sorter;

pub use content::{HierarchyNode, HierarchyView};
pub use filter::MemberFilter;
pub use policy::{ExpandLevel, ViewPolicy};
pub use sorter::HierarchySorter;
