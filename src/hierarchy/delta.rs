//! Translation of change event trees into changed hierarchy types.
//!
//! The walk classifies each node first and then acts on the classification:
//!
//! | node                         | action                                   |
//! |------------------------------|------------------------------------------|
//! | model, project, root, package| descend                                  |
//! | type                         | mark if in snapshot, descend             |
//! | working-copy unit            | ignore subtree                           |
//! | primary unit, structural     | mark every snapshot type of the unit     |
//! | primary unit, otherwise      | descend                                  |
//! | binary, changed              | mark its top-level type                  |
//! | binary, otherwise            | descend                                  |
//! | member                       | ignore                                   |

use indexmap::IndexSet;

use crate::base::{ContainerId, TypeId};
use crate::model::{ChangeEvent, DeltaElement, DeltaKind, HierarchySnapshot, SymbolDatabase};

/// Result of processing a change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangedTypes {
    /// Everything may have changed.
    Full,
    /// Only these snapshot types, in first-seen order.
    Types(Vec<TypeId>),
}

impl ChangedTypes {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Types(types) if types.is_empty())
    }

    /// The listed types; empty for [`ChangedTypes::Full`].
    pub fn types(&self) -> &[TypeId] {
        match self {
            Self::Full => &[],
            Self::Types(types) => types,
        }
    }
}

enum NodeAction<'e> {
    Descend,
    Type(&'e TypeId),
    StructuralUnit(&'e ContainerId),
    ChangedBinary(&'e TypeId),
    Ignore,
}

fn classify(delta: &ChangeEvent) -> NodeAction<'_> {
    match &delta.element {
        DeltaElement::Model
        | DeltaElement::Project(_)
        | DeltaElement::SourceRoot(_)
        | DeltaElement::Package(_) => NodeAction::Descend,
        DeltaElement::Type(ty) => NodeAction::Type(ty),
        DeltaElement::Unit { primary: false, .. } => NodeAction::Ignore,
        DeltaElement::Unit { unit, .. } => {
            if delta.kind == DeltaKind::Changed && delta.flags.is_structural() {
                NodeAction::StructuralUnit(unit)
            } else {
                NodeAction::Descend
            }
        }
        DeltaElement::Binary { top_level, .. } => {
            if delta.kind == DeltaKind::Changed {
                NodeAction::ChangedBinary(top_level)
            } else {
                NodeAction::Descend
            }
        }
        DeltaElement::Member(_) => NodeAction::Ignore,
    }
}

/// Finds the snapshot types affected by a change event.
pub struct ChangeDeltaProcessor<'a> {
    db: &'a dyn SymbolDatabase,
    snapshot: &'a dyn HierarchySnapshot,
}

impl<'a> ChangeDeltaProcessor<'a> {
    pub fn new(db: &'a dyn SymbolDatabase, snapshot: &'a dyn HierarchySnapshot) -> Self {
        Self { db, snapshot }
    }

    /// Walk `delta` and collect the changed types. Never returns
    /// [`ChangedTypes::Full`]; structural invalidation is signalled by the
    /// database separately.
    pub fn process(&self, delta: &ChangeEvent) -> ChangedTypes {
        let mut changed = IndexSet::new();
        self.visit(delta, &mut changed);
        ChangedTypes::Types(changed.into_iter().collect())
    }

    fn visit(&self, delta: &ChangeEvent, changed: &mut IndexSet<TypeId>) {
        match classify(delta) {
            NodeAction::Descend => self.visit_children(delta, changed),
            NodeAction::Type(ty) => {
                self.mark(ty, changed);
                self.visit_children(delta, changed);
            }
            NodeAction::StructuralUnit(unit) => self.mark_unit(unit, changed),
            NodeAction::ChangedBinary(ty) => self.mark(ty, changed),
            NodeAction::Ignore => {}
        }
    }

    fn visit_children(&self, delta: &ChangeEvent, changed: &mut IndexSet<TypeId>) {
        for child in &delta.children {
            self.visit(child, changed);
        }
    }

    fn mark(&self, ty: &TypeId, changed: &mut IndexSet<TypeId>) {
        if self.snapshot.contains(ty) {
            tracing::trace!("[DELTA] {} changed", ty);
            changed.insert(ty.clone());
        }
    }

    fn mark_unit(&self, unit: &ContainerId, changed: &mut IndexSet<TypeId>) {
        match self.db.types_in_unit(unit) {
            Ok(types) => {
                for ty in &types {
                    self.mark(ty, changed);
                }
            }
            Err(err) => tracing::warn!("[DELTA] Skipping unit {}: {}", unit, err),
        }
    }
}
