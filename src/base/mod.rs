//! Foundation types for the hierarchy engine.
//!
//! This module provides the handles every other layer speaks in:
//! - [`TypeId`] - Identity of a class/interface-like declaration
//! - [`ContainerId`], [`Container`] - Projects, source roots, packages and units
//! - [`Member`], [`MemberKind`], [`Modifiers`] - Members owned by a type
//!
//! This module has NO dependencies on other typehier modules.

mod ids;
mod member;

pub use ids::{Container, ContainerId, ContainerKind, TypeId};
pub use member::{Member, MemberKind, Modifiers};

// Re-export the name type so callers can build ids without a direct dependency
pub use smol_str::SmolStr;
