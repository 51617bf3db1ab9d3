//! Input scopes and scope membership.

use rustc_hash::FxHashSet;

use crate::base::{Container, ContainerId, ContainerKind, TypeId};
use crate::model::{BuildRequest, HierarchyMode, ModelError, SymbolDatabase};

/// What a lifecycle computes its hierarchy for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputScope {
    /// A single focus type.
    Type(TypeId),
    /// Projects, source roots or packages. Regions have no focus.
    Region(Vec<ContainerId>),
}

impl InputScope {
    pub fn region<I, C>(containers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ContainerId>,
    {
        Self::Region(containers.into_iter().map(Into::into).collect())
    }

    /// The focus type of a single-type scope.
    pub fn focus(&self) -> Option<&TypeId> {
        match self {
            Self::Type(ty) => Some(ty),
            Self::Region(_) => None,
        }
    }

    pub fn is_region(&self) -> bool {
        matches!(self, Self::Region(_))
    }

    /// Translate the scope into a database request.
    ///
    /// Projects in a region expand to their non-external source roots; every
    /// other container is kept as given.
    pub(crate) fn build_request(
        &self,
        db: &dyn SymbolDatabase,
        mode: HierarchyMode,
    ) -> Result<BuildRequest, ModelError> {
        match self {
            Self::Type(focus) => Ok(BuildRequest::Type {
                focus: focus.clone(),
                mode,
            }),
            Self::Region(containers) => {
                let mut expanded = Vec::with_capacity(containers.len());
                for id in containers {
                    let container = db.container(id)?;
                    if container.kind == ContainerKind::Project {
                        expanded.extend(
                            db.child_containers(id)?
                                .into_iter()
                                .filter(|c| c.kind == ContainerKind::SourceRoot && !c.external)
                                .map(|c| c.id),
                        );
                    } else {
                        expanded.push(container.id);
                    }
                }
                Ok(BuildRequest::Region {
                    containers: expanded,
                })
            }
        }
    }
}

impl From<TypeId> for InputScope {
    fn from(ty: TypeId) -> Self {
        Self::Type(ty)
    }
}

// ============================================================================
// WORKING SET
// ============================================================================

/// A user-selected set of containers further restricting visible types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    containers: FxHashSet<ContainerId>,
}

impl WorkingSet {
    pub fn new<I, C>(containers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ContainerId>,
    {
        Self {
            containers: containers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.containers.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

// ============================================================================
// SCOPE FILTER
// ============================================================================

/// Decides whether a type belongs to an input scope and working set.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScopeFilter {
    region: Option<Vec<Container>>,
    working_set: Option<WorkingSet>,
}

impl ScopeFilter {
    pub(crate) fn new(
        db: &dyn SymbolDatabase,
        scope: Option<&InputScope>,
        working_set: Option<WorkingSet>,
    ) -> Self {
        let region = match scope {
            Some(InputScope::Region(ids)) => Some(
                ids.iter()
                    .filter_map(|id| match db.container(id) {
                        Ok(container) => Some(container),
                        Err(err) => {
                            tracing::debug!("[SCOPE] Dropping region element {}: {}", id, err);
                            None
                        }
                    })
                    .collect(),
            ),
            _ => None,
        };
        Self {
            region,
            working_set,
        }
    }

    /// Whether `ty` is in scope. Lookup failures count as "not in scope".
    pub(crate) fn admits(&self, db: &dyn SymbolDatabase, ty: &TypeId) -> bool {
        if self.region.is_none() && self.working_set.is_none() {
            return true;
        }
        let ancestors = match db.ancestors(ty) {
            Ok(ancestors) => ancestors,
            Err(err) => {
                tracing::debug!("[SCOPE] Cannot read ancestors of {}: {}", ty, err);
                return false;
            }
        };

        if let Some(set) = &self.working_set {
            if !ancestors.iter().any(|c| set.contains(&c.id)) {
                return false;
            }
        }

        match &self.region {
            Some(region) => region.iter().any(|element| region_admits(element, &ancestors)),
            None => true,
        }
    }
}

/// Match a region element against the nearest ancestor of the same kind.
fn region_admits(element: &Container, ancestors: &[Container]) -> bool {
    let nearest = ancestors.iter().find(|c| c.kind == element.kind);
    match (element.kind, nearest) {
        // Same-named packages in different roots are the same package.
        (ContainerKind::Package, Some(package)) => package.name == element.name,
        (ContainerKind::Package, None) => true,
        (_, Some(container)) => container.id == element.id,
        (_, None) => false,
    }
}
