//! Traversal policies.
//!
//! A policy fixes the direction of the type tree (towards supertypes or
//! towards subtypes), which types are roots, and how deep a fresh tree is
//! expanded. Member filtering and scope tests are shared and live in the
//! content provider.

use rustc_hash::FxHashSet;

use crate::base::TypeId;
use crate::config::HierarchyConfig;
use crate::hierarchy::is_supertype;
use crate::model::HierarchySnapshot;

/// Which tree a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewPolicy {
    /// From the focus up the superclass chain.
    Supertype,
    /// From the root classes above the focus down through subclasses.
    Subtype,
    /// Like [`ViewPolicy::Subtype`], rooted at the universal base type.
    Traditional,
}

/// How many tree levels to expand initially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpandLevel {
    All,
    Levels(usize),
}

impl ViewPolicy {
    /// Type children of `ty` in this policy's direction.
    pub fn type_children(self, snapshot: &dyn HierarchySnapshot, ty: &TypeId) -> Vec<TypeId> {
        match self {
            Self::Supertype => snapshot.superclass(ty).into_iter().collect(),
            // The universal base takes the same path as every other type.
            Self::Subtype | Self::Traditional => snapshot.subclasses(ty),
        }
    }

    /// Root candidates before visibility filtering.
    pub fn root_types(
        self,
        snapshot: &dyn HierarchySnapshot,
        config: &HierarchyConfig,
    ) -> Vec<TypeId> {
        let focus = snapshot.focus_type();
        match self {
            Self::Supertype => focus.into_iter().collect(),
            Self::Subtype => {
                let roots = snapshot.root_classes();
                match focus {
                    Some(focus) => roots
                        .into_iter()
                        .filter(|root| *root == focus || is_supertype(snapshot, root, &focus))
                        .collect(),
                    None => roots,
                }
            }
            Self::Traditional => {
                let roots = snapshot.root_classes();
                match &config.universal_base {
                    Some(base) if roots.contains(base) => vec![base.clone()],
                    _ => roots,
                }
            }
        }
    }

    /// The type above `ty` in this policy's tree.
    pub fn type_parent(self, snapshot: &dyn HierarchySnapshot, ty: &TypeId) -> Option<TypeId> {
        match self {
            Self::Supertype => {
                // Walk down from the focus; the parent is the previous link.
                let mut current = snapshot.focus_type()?;
                let mut visited = FxHashSet::default();
                while visited.insert(current.clone()) {
                    let sup = snapshot.superclass(&current)?;
                    if &sup == ty {
                        return Some(current);
                    }
                    current = sup;
                }
                None
            }
            Self::Subtype | Self::Traditional => snapshot.superclass(ty),
        }
    }

    /// Initial expansion depth.
    pub fn expand_level(self, snapshot: Option<&dyn HierarchySnapshot>) -> ExpandLevel {
        match self {
            Self::Supertype => ExpandLevel::All,
            Self::Subtype => ExpandLevel::Levels(2),
            Self::Traditional => match snapshot {
                None => ExpandLevel::Levels(2),
                Some(snapshot) => match snapshot.focus_type() {
                    Some(focus) => ExpandLevel::Levels(depth(snapshot, &focus) + 2),
                    None => ExpandLevel::Levels(5),
                },
            },
        }
    }
}

/// Number of superclass hops from `ty` to the top of its chain.
fn depth(snapshot: &dyn HierarchySnapshot, ty: &TypeId) -> usize {
    let mut visited = FxHashSet::default();
    let mut hops = 0;
    let mut current = ty.clone();
    while let Some(sup) = snapshot.superclass(&current) {
        if !visited.insert(sup.clone()) {
            break;
        }
        hops += 1;
        current = sup;
    }
    hops
}
