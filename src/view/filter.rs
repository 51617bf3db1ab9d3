//! Member filters.

use indexmap::IndexSet;

use crate::base::{Member, TypeId};

/// An ordered set of members restricting which types a view shows.
///
/// A type stays visible when it declares a filtered member, has a method
/// compatible with one, or leads to such a type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilter {
    members: IndexSet<Member>,
}

impl MemberFilter {
    pub fn new(members: impl IntoIterator<Item = Member>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn contains(&self, member: &Member) -> bool {
        self.members.contains(member)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    /// Filtered members declared by `ty`.
    pub fn declared_by<'a>(&'a self, ty: &'a TypeId) -> impl Iterator<Item = &'a Member> + 'a {
        self.members.iter().filter(move |m| &m.declaring_type == ty)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<Member> for MemberFilter {
    fn from_iter<I: IntoIterator<Item = Member>>(iter: I) -> Self {
        Self::new(iter)
    }
}
