//! Program-model collaborators for the Vega type-migration engine.
//!
//! The migration engine never inspects program text itself. It works against
//! the [`ProgramModel`] trait: a type resolver that knows each element's
//! current type and which other elements depend on it. [`MemoryModel`] is the
//! in-memory implementation used by the CLI and by every engine test; real
//! editors would back the trait with their own semantic index.

mod ids;
mod memory;
mod model;
mod types;

pub use ids::{ElementId, FileId, TextRange};
pub use memory::{
    DependencyDescription, ElementDescription, MemoryModel, ModelError, ProgramDescription,
};
pub use model::{DependentSite, ProgramModel, UsageKind};
pub use types::TypeRef;
