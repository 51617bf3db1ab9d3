//! Change events emitted by the symbol database.
//!
//! A [`ChangeEvent`] mirrors the database's element tree: the model root,
//! projects, source roots, packages, units, types and members. Each node
//! records what happened to its element and carries the deltas of its
//! children.

use bitflags::bitflags;

use crate::base::{ContainerId, Member, TypeId};

bitflags! {
    /// Detail flags attached to a `Changed` delta.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeltaFlags: u32 {
        /// The element's content changed.
        const CONTENT = 1 << 0;
        const MODIFIERS = 1 << 1;
        /// Children were added, removed or changed.
        const CHILDREN = 1 << 3;
        const SUPER_TYPES = 1 << 11;
        /// The delta was computed by a fine-grained analysis of the edit;
        /// without this flag a `CONTENT` change means a reparse happened.
        const FINE_GRAINED = 1 << 14;
        const PRIMARY_RESOURCE = 1 << 18;
    }
}

impl DeltaFlags {
    /// A content change that was not analysed at fine granularity, so the
    /// declared types of the element may have changed.
    pub fn is_structural(self) -> bool {
        self.intersection(Self::CONTENT | Self::FINE_GRAINED) == Self::CONTENT
    }
}

/// What happened to the element of a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    Added,
    Removed,
    Changed,
}

/// The element a delta node is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeltaElement {
    Model,
    Project(ContainerId),
    SourceRoot(ContainerId),
    Package(ContainerId),
    /// A source unit. `primary` is false for transient working copies.
    Unit { unit: ContainerId, primary: bool },
    /// A compiled artifact declaring exactly one top-level type.
    Binary { artifact: ContainerId, top_level: TypeId },
    Type(TypeId),
    Member(Member),
}

/// A node of a change event tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub element: DeltaElement,
    pub kind: DeltaKind,
    pub flags: DeltaFlags,
    pub children: Vec<ChangeEvent>,
}

impl ChangeEvent {
    pub fn new(element: DeltaElement, kind: DeltaKind) -> Self {
        Self {
            element,
            kind,
            flags: DeltaFlags::empty(),
            children: Vec::new(),
        }
    }

    /// A `Changed` delta with the given flags.
    pub fn changed(element: DeltaElement, flags: DeltaFlags) -> Self {
        Self::new(element, DeltaKind::Changed).with_flags(flags)
    }

    pub fn with_flags(mut self, flags: DeltaFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_child(mut self, child: ChangeEvent) -> Self {
        self.children.push(child);
        self
    }

    /// Wrap this delta in a parent `Changed` delta flagged with `CHILDREN`.
    pub fn wrap(self, parent: DeltaElement) -> Self {
        Self::changed(parent, DeltaFlags::CHILDREN).with_child(self)
    }
}
