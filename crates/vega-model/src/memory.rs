use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ElementId, FileId};
use crate::model::{DependentSite, ProgramModel, UsageKind};
use crate::types::TypeRef;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate element `{0}`")]
    DuplicateElement(String),
    #[error("unknown element `{0}`")]
    UnknownElement(String),
}

#[derive(Clone, Debug)]
struct ElementData {
    name: String,
    ty: TypeRef,
    file: FileId,
    valid: bool,
    /// A fixed element keeps its declared type; migrating a dependency onto
    /// it produces a failed conversion instead of an edge.
    fixed: bool,
}

#[derive(Clone, Debug)]
struct DependencyEdge {
    target: ElementId,
    kind: UsageKind,
    /// `None` means the dependent must take the parent's new type verbatim.
    required: Option<TypeRef>,
}

/// In-memory [`ProgramModel`] used by tests and the CLI.
///
/// Elements and dependency edges are registered up front; `direct_dependents`
/// replays the edges in insertion order.
#[derive(Clone, Debug, Default)]
pub struct MemoryModel {
    elements: Vec<ElementData>,
    by_name: HashMap<String, ElementId>,
    deps: Vec<Vec<DependencyEdge>>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        ty: impl Into<TypeRef>,
        file: impl Into<String>,
    ) -> ElementId {
        let name = name.into();
        let id = ElementId(self.elements.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.elements.push(ElementData {
            name,
            ty: ty.into(),
            file: FileId::new(file),
            valid: true,
            fixed: false,
        });
        self.deps.push(Vec::new());
        id
    }

    /// `target` must change type whenever `source` does.
    pub fn add_dependency(&mut self, source: ElementId, target: ElementId, kind: UsageKind) {
        self.deps[source.index()].push(DependencyEdge {
            target,
            kind,
            required: None,
        });
    }

    /// Like [`add_dependency`](Self::add_dependency), but the dependent takes
    /// `required` instead of the parent's new type (e.g. an array access site
    /// taking the component type).
    pub fn add_dependency_with_type(
        &mut self,
        source: ElementId,
        target: ElementId,
        kind: UsageKind,
        required: impl Into<TypeRef>,
    ) {
        self.deps[source.index()].push(DependencyEdge {
            target,
            kind,
            required: Some(required.into()),
        });
    }

    /// Mark an element as unable to accept any migrated type.
    pub fn mark_fixed(&mut self, element: ElementId) {
        self.elements[element.index()].fixed = true;
    }

    /// Simulate the element disappearing from the underlying program.
    pub fn invalidate(&mut self, element: ElementId) {
        self.elements[element.index()].valid = false;
    }

    pub fn find_element(&self, name: &str) -> Option<ElementId> {
        self.by_name.get(name).copied()
    }

    pub fn from_description(desc: &ProgramDescription) -> Result<Self, ModelError> {
        let mut model = MemoryModel::new();
        for element in &desc.elements {
            if model.by_name.contains_key(&element.name) {
                return Err(ModelError::DuplicateElement(element.name.clone()));
            }
            let id = model.add_element(&element.name, element.ty.as_str(), &element.file);
            if element.fixed {
                model.mark_fixed(id);
            }
        }
        for dep in &desc.dependencies {
            let source = model
                .find_element(&dep.from)
                .ok_or_else(|| ModelError::UnknownElement(dep.from.clone()))?;
            let target = model
                .find_element(&dep.to)
                .ok_or_else(|| ModelError::UnknownElement(dep.to.clone()))?;
            match &dep.required_type {
                Some(ty) => model.add_dependency_with_type(source, target, dep.kind, ty.as_str()),
                None => model.add_dependency(source, target, dep.kind),
            }
        }
        Ok(model)
    }
}

impl ProgramModel for MemoryModel {
    fn element_name(&self, element: ElementId) -> Option<&str> {
        self.elements.get(element.index()).map(|e| e.name.as_str())
    }

    fn element_type(&self, element: ElementId) -> Option<TypeRef> {
        let data = self.elements.get(element.index())?;
        data.valid.then(|| data.ty.clone())
    }

    fn containing_file(&self, element: ElementId) -> Option<FileId> {
        self.elements.get(element.index()).map(|e| e.file.clone())
    }

    fn is_valid(&self, element: ElementId) -> bool {
        self.elements
            .get(element.index())
            .map(|e| e.valid)
            .unwrap_or(false)
    }

    fn direct_dependents(&self, element: ElementId, new_type: &TypeRef) -> Vec<DependentSite> {
        let Some(edges) = self.deps.get(element.index()) else {
            return Vec::new();
        };
        edges
            .iter()
            .map(|edge| DependentSite {
                element: edge.target,
                kind: edge.kind,
                required_type: edge.required.clone().unwrap_or_else(|| new_type.clone()),
            })
            .collect()
    }

    fn can_accept(&self, element: ElementId, _new_type: &TypeRef) -> bool {
        self.elements
            .get(element.index())
            .map(|e| e.valid && !e.fixed)
            .unwrap_or(false)
    }
}

/// Serializable description of a program model, consumed by the CLI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDescription {
    pub elements: Vec<ElementDescription>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDescription>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub file: String,
    #[serde(default)]
    pub fixed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescription {
    pub from: String,
    pub to: String,
    #[serde(default = "default_kind")]
    pub kind: UsageKind,
    #[serde(default)]
    pub required_type: Option<TypeRef>,
}

fn default_kind() -> UsageKind {
    UsageKind::Unknown
}
