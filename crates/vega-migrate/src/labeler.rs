use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vega_model::{DependentSite, ElementId, ProgramModel, TypeRef};

use crate::usage::{MigrationUsage, UsageHandle};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("element {0:?} is no longer valid")]
    InvalidElement(ElementId),
    #[error("element {0:?} has no resolvable type")]
    UntypedElement(ElementId),
    #[error("element {0:?} is outside the allowed migration roots")]
    RootNotAllowed(ElementId),
}

/// A dependent site that could not safely take its required type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedConversion {
    pub element: ElementId,
    /// Display name snapshot, taken when the failure was recorded.
    pub name: String,
    pub from: Option<TypeRef>,
    pub to: TypeRef,
    /// The root usage whose expansion produced this failure.
    pub root: ElementId,
}

#[derive(Clone, Debug, Default)]
pub struct LabelerOptions {
    /// When set, only these elements may become migration roots; dependents
    /// outside the set are silently skipped.
    pub allowed_roots: Option<HashSet<ElementId>>,
}

/// The migration fixpoint engine.
///
/// Given one usage and a candidate new type, the labeler discovers the other
/// usages whose type must change as a consequence and classifies each as
/// migratable or failed. Discovery is lazy per node: the session tree calls
/// [`mark_root_usages`](Self::mark_root_usages) /
/// [`set_root_and_migrate`](Self::set_root_and_migrate) exactly once per node
/// it expands, and reads committed edges back through
/// [`root_edges`](Self::root_edges).
pub struct TypeMigrationLabeler<'m> {
    model: &'m dyn ProgramModel,
    options: LabelerOptions,
    /// Interner: one handle per element per session. Realizes the
    /// canonical-instance rule for the excluded flag.
    usages: HashMap<ElementId, UsageHandle>,
    /// Adjacency of the migration dependency graph, per parent in discovery
    /// order ("roots tree").
    roots_tree: HashMap<ElementId, Vec<(UsageHandle, TypeRef)>>,
    /// Session-wide accepted usages in discovery order.
    migration_order: Vec<(UsageHandle, TypeRef)>,
    processed_roots: HashSet<ElementId>,
    failed: Vec<FailedConversion>,
    current_root: Option<UsageHandle>,
}

impl<'m> TypeMigrationLabeler<'m> {
    pub fn new(model: &'m dyn ProgramModel) -> Self {
        Self::with_options(model, LabelerOptions::default())
    }

    pub fn with_options(model: &'m dyn ProgramModel, options: LabelerOptions) -> Self {
        Self {
            model,
            options,
            usages: HashMap::new(),
            roots_tree: HashMap::new(),
            migration_order: Vec::new(),
            processed_roots: HashSet::new(),
            failed: Vec::new(),
            current_root: None,
        }
    }

    pub fn model(&self) -> &'m dyn ProgramModel {
        self.model
    }

    /// Register the user-selected migration root.
    pub fn add_migration_root(
        &mut self,
        element: ElementId,
        new_type: TypeRef,
    ) -> Result<UsageHandle, MigrateError> {
        if !self.root_allowed(element) {
            return Err(MigrateError::RootNotAllowed(element));
        }
        if !self.model.is_valid(element) {
            return Err(MigrateError::InvalidElement(element));
        }
        if self.model.element_type(element).is_none() {
            return Err(MigrateError::UntypedElement(element));
        }
        let handle = self.intern(element, false);
        if self.processed_roots.insert(element) {
            self.migration_order.push((handle.clone(), new_type));
        }
        Ok(handle)
    }

    /// Pure discovery: the direct dependents of `element` affected if its
    /// type became `new_type`. Does not mutate any engine state. Callers
    /// treat an error as "no children": the node renders as a leaf and the
    /// failure does not propagate upward.
    pub fn mark_root_usages(
        &self,
        element: ElementId,
        new_type: &TypeRef,
    ) -> Result<Vec<DependentSite>, MigrateError> {
        if !self.model.is_valid(element) {
            return Err(MigrateError::InvalidElement(element));
        }
        let original = self
            .model
            .element_type(element)
            .ok_or(MigrateError::UntypedElement(element))?;
        if original == *new_type {
            return Ok(Vec::new());
        }
        let dependents = self.model.direct_dependents(element, new_type);
        tracing::trace!(
            element = element.0,
            new_type = %new_type,
            dependents = dependents.len(),
            "marked root usages"
        );
        Ok(dependents)
    }

    /// Commit a discovery result into the roots tree, classifying every
    /// dependent as an edge or a failed conversion. Idempotent per root: the
    /// stored edge set is replaced, not extended.
    pub fn set_root_and_migrate(
        &mut self,
        root: &UsageHandle,
        new_type: &TypeRef,
        raw_usages: Vec<DependentSite>,
    ) {
        self.current_root = Some(root.clone());
        let root_excluded = root.is_excluded();
        let mut edges: Vec<(UsageHandle, TypeRef)> = Vec::new();

        for site in raw_usages {
            if !self.root_allowed(site.element) || !self.model.is_valid(site.element) {
                continue;
            }
            // Nothing to do when the dependent already has the required type.
            if self.model.element_type(site.element).as_ref() == Some(&site.required_type) {
                continue;
            }

            if self.model.can_accept(site.element, &site.required_type) {
                let handle = self.intern(site.element, root_excluded);
                if self.processed_roots.insert(site.element) {
                    self.migration_order
                        .push((handle.clone(), site.required_type.clone()));
                }
                let edge = (handle, site.required_type);
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            } else {
                self.mark_failed_conversion(site.element, site.required_type, root.element());
            }
        }

        tracing::debug!(
            root = root.element().0,
            new_type = %new_type,
            edges = edges.len(),
            "committed migration root"
        );
        self.roots_tree.insert(root.element(), edges);
    }

    /// Committed edges for a parent usage, in discovery order. Empty for
    /// usages that have not been committed as roots.
    pub fn root_edges(&self, element: ElementId) -> &[(UsageHandle, TypeRef)] {
        self.roots_tree
            .get(&element)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The full flattened set of usages accepted across the session, in
    /// discovery order, each with its migration type.
    pub fn migrated(&self) -> &[(UsageHandle, TypeRef)] {
        &self.migration_order
    }

    pub fn migrated_usages(&self) -> Vec<UsageHandle> {
        self.migration_order
            .iter()
            .map(|(usage, _)| usage.clone())
            .collect()
    }

    pub fn has_failed_conversions(&self) -> bool {
        !self.failed.is_empty()
    }

    /// All failure records, in the order the engine produced them.
    pub fn failed_usages(&self) -> &[FailedConversion] {
        &self.failed
    }

    /// Failures recorded while expanding `root` itself (not its descendants).
    pub fn failed_usages_for(&self, root: ElementId) -> Vec<&FailedConversion> {
        self.failed.iter().filter(|f| f.root == root).collect()
    }

    /// The interned handle for an element, if it has been discovered.
    pub fn usage(&self, element: ElementId) -> Option<&UsageHandle> {
        self.usages.get(&element)
    }

    pub fn current_root(&self) -> Option<&UsageHandle> {
        self.current_root.as_ref()
    }

    /// Deterministic plain-text dump of the session, for tests and the CLI.
    pub fn migration_report(&self) -> String {
        let mut buffer = String::from("Types:\n");
        let mut lines: Vec<String> = self
            .migration_order
            .iter()
            .map(|(usage, ty)| {
                format!("{} -> {}\n", self.display_name(usage.element()), ty)
            })
            .collect();
        lines.sort();
        for line in &lines {
            buffer.push_str(line);
        }

        buffer.push_str("Fails:\n");
        let mut fails: Vec<String> = self
            .failed
            .iter()
            .map(|f| format!("{} -> {}\n", f.name, f.to))
            .collect();
        fails.sort();
        for line in &fails {
            buffer.push_str(line);
        }
        buffer
    }

    fn display_name(&self, element: ElementId) -> String {
        self.model
            .element_name(element)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", element.0))
    }

    /// Intern the single session-wide handle for `element`. The exclusion
    /// cascade applies only here, at creation time: a usage freshly
    /// discovered under an excluded root starts excluded, but an existing
    /// handle is never overwritten.
    fn intern(&mut self, element: ElementId, inherit_excluded: bool) -> UsageHandle {
        if let Some(existing) = self.usages.get(&element) {
            return existing.clone();
        }
        let handle = MigrationUsage::new(element);
        if inherit_excluded {
            handle.set_excluded(true);
        }
        self.usages.insert(element, handle.clone());
        handle
    }

    fn mark_failed_conversion(&mut self, element: ElementId, to: TypeRef, root: ElementId) {
        // One record per (element, target type), like repeated conversion
        // attempts through different paths.
        if self
            .failed
            .iter()
            .any(|f| f.element == element && f.to == to)
        {
            return;
        }
        tracing::debug!(element = element.0, to = %to, "failed conversion");
        self.failed.push(FailedConversion {
            element,
            name: self.display_name(element),
            from: self.model.element_type(element),
            to,
            root,
        });
    }

    fn root_allowed(&self, element: ElementId) -> bool {
        match &self.options.allowed_roots {
            Some(allowed) => allowed.contains(&element),
            None => true,
        }
    }
}
