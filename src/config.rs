//! Configuration for lifecycles, views and sorters.

use crate::base::TypeId;
use crate::model::HierarchyMode;

/// How sibling nodes are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SortOrder {
    /// Compare by simple name instead of source position.
    pub alphabetic: bool,
    /// Place members whose overridden declaration lives deeper in the
    /// hierarchy before members defined higher up.
    pub by_defining_type: bool,
}

impl SortOrder {
    /// Source order.
    pub const SOURCE: Self = Self {
        alphabetic: false,
        by_defining_type: false,
    };

    pub const ALPHABETIC: Self = Self {
        alphabetic: true,
        by_defining_type: false,
    };
}

/// Settings shared by a lifecycle and the views over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// Single-type hierarchy mode, fixed for the lifetime of a lifecycle.
    pub mode: HierarchyMode,
    /// The implicit root of every class hierarchy. Traditional views show it as
    /// the only root when it is one.
    pub universal_base: Option<TypeId>,
    pub sort: SortOrder,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            mode: HierarchyMode::Full,
            universal_base: Some(TypeId::new("Object")),
            sort: SortOrder::default(),
        }
    }
}

impl HierarchyConfig {
    pub fn with_mode(mut self, mode: HierarchyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_universal_base(mut self, base: Option<TypeId>) -> Self {
        self.universal_base = base;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}
