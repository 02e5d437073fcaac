use serde::{Deserialize, Serialize};

use crate::ids::{ElementId, FileId};
use crate::types::TypeRef;

/// How a dependent site relates to the element being migrated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    Assignment,
    Argument,
    Return,
    Call,
    Override,
    Unknown,
}

/// One direct dependent of a migrated element, as reported by the program
/// model: an element whose declared type must become `required_type` if the
/// migration goes through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependentSite {
    pub element: ElementId,
    pub kind: UsageKind,
    pub required_type: TypeRef,
}

/// The program model / type resolver collaborator.
///
/// Implementations supply element types and the "direct dependents" relation
/// the migration engine propagates over. The engine calls `direct_dependents`
/// at most once per element per session (lazy expansion); implementations are
/// free to compute it eagerly or on demand.
///
/// All methods take `&self`: discovery runs under the host's read-action
/// boundary, so the model must not be mutated concurrently with a walk.
pub trait ProgramModel {
    /// Display name of an element, for reports. `None` for unknown ids.
    fn element_name(&self, element: ElementId) -> Option<&str>;

    /// The element's current declared type. `None` when the element has
    /// become structurally invalid.
    fn element_type(&self, element: ElementId) -> Option<TypeRef>;

    /// The file owning the element's declaration.
    fn containing_file(&self, element: ElementId) -> Option<FileId>;

    /// Whether the element still exists in the underlying program.
    fn is_valid(&self, element: ElementId) -> bool;

    /// Direct dependents of `element` that would be affected if its type
    /// became `new_type`, in a stable discovery order.
    fn direct_dependents(&self, element: ElementId, new_type: &TypeRef) -> Vec<DependentSite>;

    /// Whether `element` can safely take on `new_type`. Sites that cannot are
    /// reported as failed conversions rather than migrated.
    fn can_accept(&self, element: ElementId, new_type: &TypeRef) -> bool;
}
