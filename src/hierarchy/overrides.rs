//! Override resolution over a hierarchy snapshot.
//!
//! A resolver answers "which method does this one override" and "which method
//! overrides this one" within the superclass chains recorded in a snapshot.
//! Member lists are read from the database once per type and cached for the
//! lifetime of the resolver; callers drop the resolver when the hierarchy
//! changes.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::{Member, TypeId};
use crate::model::{HierarchySnapshot, SymbolDatabase};

/// Override queries for one focus type.
pub struct OverrideResolver {
    db: Arc<dyn SymbolDatabase>,
    snapshot: Arc<dyn HierarchySnapshot>,
    focus: TypeId,
    members: Mutex<FxHashMap<TypeId, Arc<[Member]>>>,
}

impl OverrideResolver {
    pub fn new(
        db: Arc<dyn SymbolDatabase>,
        snapshot: Arc<dyn HierarchySnapshot>,
        focus: TypeId,
    ) -> Self {
        Self {
            db,
            snapshot,
            focus,
            members: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn focus(&self) -> &TypeId {
        &self.focus
    }

    /// Members of `ty`; unreadable types have none.
    fn members_of(&self, ty: &TypeId) -> Arc<[Member]> {
        if let Some(members) = self.members.lock().get(ty) {
            return members.clone();
        }
        let members: Arc<[Member]> = match self.db.members(ty) {
            Ok(members) => Arc::from(members),
            Err(err) => {
                tracing::debug!("[OVERRIDES] Cannot read members of {}: {}", ty, err);
                Arc::from(Vec::<Member>::new())
            }
        };
        self.members.lock().insert(ty.clone(), members.clone());
        members
    }

    /// The declaration of `member` as `ty` holds it, with current modifiers
    /// and offset.
    pub fn find_declared_member(&self, ty: &TypeId, member: &Member) -> Option<Member> {
        self.members_of(ty).iter().find(|m| *m == member).cloned()
    }

    /// The method of `ty` that `overriding` overrides, if any.
    pub fn find_overridden_method_in_type(
        &self,
        ty: &TypeId,
        overriding: &Member,
    ) -> Option<Member> {
        if !overriding.is_inheritable() {
            return None;
        }
        self.members_of(ty)
            .iter()
            .find(|m| m.is_inheritable() && self.db.is_subsignature(overriding, m))
            .cloned()
    }

    /// The method of `ty` that overrides `overridden`, if any.
    pub fn find_overriding_method_in_type(
        &self,
        ty: &TypeId,
        overridden: &Member,
    ) -> Option<Member> {
        if !overridden.is_inheritable() {
            return None;
        }
        self.members_of(ty)
            .iter()
            .find(|m| self.db.is_subsignature(m, overridden))
            .cloned()
    }

    /// The nearest method up the superclass chain that `overriding` overrides.
    pub fn find_overridden_method(&self, overriding: &Member) -> Option<Member> {
        if !overriding.is_inheritable() {
            return None;
        }
        let mut visited = FxHashSet::default();
        let mut current = self.snapshot.superclass(&overriding.declaring_type);
        while let Some(ty) = current {
            if !visited.insert(ty.clone()) {
                break;
            }
            if let Some(found) = self.find_overridden_method_in_type(&ty, overriding) {
                return Some(found);
            }
            current = self.snapshot.superclass(&ty);
        }
        None
    }

    /// The top-most declaration `method` overrides, or `None` when it
    /// overrides nothing.
    pub fn find_declaring_method(&self, method: &Member) -> Option<Member> {
        let mut result = None;
        let mut current = self.find_overridden_method(method);
        while let Some(found) = current {
            if result.as_ref() == Some(&found) {
                break;
            }
            current = self.find_overridden_method(&found);
            result = Some(found);
        }
        result
    }

    /// The declaring type of the top-most declaration `method` overrides.
    pub fn find_defining_type(&self, method: &Member) -> Option<TypeId> {
        if !method.is_inheritable() {
            return None;
        }
        self.find_declaring_method(method)
            .filter(|declaring| declaring != method)
            .map(|declaring| declaring.declaring_type)
    }
}

/// Resolvers keyed by focus type, valid for one snapshot generation.
#[derive(Default)]
pub(crate) struct ResolverCache {
    generation: u64,
    resolvers: FxHashMap<TypeId, Arc<OverrideResolver>>,
}

impl ResolverCache {
    /// The resolver for `focus`, dropping every cached resolver first if the
    /// generation moved.
    pub(crate) fn resolver(
        &mut self,
        generation: u64,
        db: &Arc<dyn SymbolDatabase>,
        snapshot: &Arc<dyn HierarchySnapshot>,
        focus: &TypeId,
    ) -> Arc<OverrideResolver> {
        if self.generation != generation {
            self.clear();
            self.generation = generation;
        }
        self.resolvers
            .entry(focus.clone())
            .or_insert_with(|| {
                Arc::new(OverrideResolver::new(
                    db.clone(),
                    snapshot.clone(),
                    focus.clone(),
                ))
            })
            .clone()
    }

    pub(crate) fn clear(&mut self) {
        self.resolvers.clear();
    }
}

/// Whether `possible_super` is a strict supertype of `ty` in the snapshot.
pub fn is_supertype(snapshot: &dyn HierarchySnapshot, possible_super: &TypeId, ty: &TypeId) -> bool {
    let mut visited = FxHashSet::default();
    let mut current = snapshot.superclass(ty);
    while let Some(sup) = current {
        if &sup == possible_super {
            return true;
        }
        if !visited.insert(sup.clone()) {
            return false;
        }
        current = snapshot.superclass(&sup);
    }
    false
}
