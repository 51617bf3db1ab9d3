//! Identity handles for types and containers.

use std::fmt;

use smol_str::SmolStr;

// ============================================================================
// TYPE ID
// ============================================================================

/// Handle to a type in the symbol database.
///
/// A `TypeId` is the type's qualified name (`pkg.Outer$Inner`). Two handles are
/// the same type iff their names are equal; whether the type currently exists
/// is a question for the database, not the handle.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(SmolStr);

impl TypeId {
    pub fn new(qualified_name: impl Into<SmolStr>) -> Self {
        Self(qualified_name.into())
    }

    /// The fully qualified name.
    pub fn qualified_name(&self) -> &str {
        self.0.as_str()
    }

    /// The name after the last package (`.`) or nesting (`$`) separator.
    pub fn simple_name(&self) -> &str {
        let name = self.0.as_str();
        match name.rfind(|c| c == '.' || c == '$') {
            Some(idx) => &name[idx + 1..],
            None => name,
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// ============================================================================
// CONTAINERS
// ============================================================================

/// Handle to a structural container (project, source root, package, unit).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(SmolStr);

impl ContainerId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerId({})", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kind of a structural container, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerKind {
    Project,
    SourceRoot,
    Package,
    Unit,
}

/// A container together with the attributes scope tests need.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Container {
    pub id: ContainerId,
    pub kind: ContainerKind,
    /// Display name; packages in different roots with the same name are
    /// considered the same package by region scopes.
    pub name: SmolStr,
    /// Library / archive content that is not part of the editable sources.
    pub external: bool,
}

impl Container {
    pub fn new(id: impl Into<SmolStr>, kind: ContainerKind, name: impl Into<SmolStr>) -> Self {
        Self {
            id: ContainerId::new(id),
            kind,
            name: name.into(),
            external: false,
        }
    }

    /// Mark the container as external (library) content.
    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}
