//! Members declared by types.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bitflags::bitflags;
use smol_str::SmolStr;

use super::TypeId;

bitflags! {
    /// Declaration modifiers relevant to override resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const PRIVATE = 1 << 0;
        const STATIC = 1 << 1;
        const CONSTRUCTOR = 1 << 2;
        const ABSTRACT = 1 << 3;
        const INTERFACE = 1 << 4;
    }
}

/// What kind of member a [`Member`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberKind {
    Method,
    Field,
    Initializer,
    Type,
}

/// A member owned by a declaring type.
///
/// Identity is `(declaring_type, kind, name, parameters)`; modifiers and the
/// source offset are attributes that may change between edits without
/// changing which member this is.
#[derive(Clone)]
pub struct Member {
    pub declaring_type: TypeId,
    pub name: SmolStr,
    pub kind: MemberKind,
    /// Parameter type names for methods, empty otherwise.
    pub parameters: Arc<[SmolStr]>,
    pub modifiers: Modifiers,
    /// Offset of the declaration in its unit.
    pub offset: u32,
}

impl Member {
    pub fn new(declaring_type: TypeId, name: impl Into<SmolStr>, kind: MemberKind) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            kind,
            parameters: Arc::from(Vec::<SmolStr>::new()),
            modifiers: Modifiers::empty(),
            offset: 0,
        }
    }

    pub fn method(declaring_type: TypeId, name: impl Into<SmolStr>, parameters: &[&str]) -> Self {
        let params: Vec<SmolStr> = parameters.iter().map(|p| SmolStr::new(p)).collect();
        Self {
            parameters: Arc::from(params),
            ..Self::new(declaring_type, name, MemberKind::Method)
        }
    }

    pub fn field(declaring_type: TypeId, name: impl Into<SmolStr>) -> Self {
        Self::new(declaring_type, name, MemberKind::Field)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn is_method(&self) -> bool {
        self.kind == MemberKind::Method
    }

    pub fn is_private(&self) -> bool {
        self.modifiers.contains(Modifiers::PRIVATE)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.modifiers.contains(Modifiers::CONSTRUCTOR)
    }

    /// A method that can take part in overriding: not private, not static,
    /// not a constructor.
    pub fn is_inheritable(&self) -> bool {
        self.is_method() && !self.is_private() && !self.is_static() && !self.is_constructor()
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type
            && self.kind == other.kind
            && self.name == other.name
            && self.parameters == other.parameters
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.kind.hash(state);
        self.name.hash(state);
        self.parameters.hash(state);
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_method() {
            write!(
                f,
                "{}#{}({})",
                self.declaring_type,
                self.name,
                self.parameters.join(", ")
            )
        } else {
            write!(f, "{}#{}", self.declaring_type, self.name)
        }
    }
}
