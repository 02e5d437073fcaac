use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use vega_model::{DependentSite, ElementId, FileId, MemoryModel, ProgramModel, TypeRef};

/// Wraps a [`MemoryModel`] and counts `direct_dependents` calls per element,
/// so tests can assert discovery happened (or did not happen) for a node.
pub struct CountingModel {
    inner: MemoryModel,
    discoveries: RefCell<HashMap<ElementId, usize>>,
}

impl CountingModel {
    pub fn new(inner: MemoryModel) -> Self {
        Self {
            inner,
            discoveries: RefCell::new(HashMap::new()),
        }
    }

    pub fn discovery_count(&self, element: ElementId) -> usize {
        self.discoveries
            .borrow()
            .get(&element)
            .copied()
            .unwrap_or(0)
    }
}

impl ProgramModel for CountingModel {
    fn element_name(&self, element: ElementId) -> Option<&str> {
        self.inner.element_name(element)
    }

    fn element_type(&self, element: ElementId) -> Option<TypeRef> {
        self.inner.element_type(element)
    }

    fn containing_file(&self, element: ElementId) -> Option<FileId> {
        self.inner.containing_file(element)
    }

    fn is_valid(&self, element: ElementId) -> bool {
        self.inner.is_valid(element)
    }

    fn direct_dependents(&self, element: ElementId, new_type: &TypeRef) -> Vec<DependentSite> {
        *self.discoveries.borrow_mut().entry(element).or_insert(0) += 1;
        self.inner.direct_dependents(element, new_type)
    }

    fn can_accept(&self, element: ElementId, new_type: &TypeRef) -> bool {
        self.inner.can_accept(element, new_type)
    }
}

/// Wraps a [`MemoryModel`] and lets tests invalidate elements mid-session
/// through a shared reference, simulating the underlying program changing
/// under an open session.
pub struct InvalidatingModel {
    inner: MemoryModel,
    invalid: RefCell<HashSet<ElementId>>,
}

impl InvalidatingModel {
    pub fn new(inner: MemoryModel) -> Self {
        Self {
            inner,
            invalid: RefCell::new(HashSet::new()),
        }
    }

    pub fn invalidate(&self, element: ElementId) {
        self.invalid.borrow_mut().insert(element);
    }
}

impl ProgramModel for InvalidatingModel {
    fn element_name(&self, element: ElementId) -> Option<&str> {
        self.inner.element_name(element)
    }

    fn element_type(&self, element: ElementId) -> Option<TypeRef> {
        if self.invalid.borrow().contains(&element) {
            return None;
        }
        self.inner.element_type(element)
    }

    fn containing_file(&self, element: ElementId) -> Option<FileId> {
        self.inner.containing_file(element)
    }

    fn is_valid(&self, element: ElementId) -> bool {
        !self.invalid.borrow().contains(&element) && self.inner.is_valid(element)
    }

    fn direct_dependents(&self, element: ElementId, new_type: &TypeRef) -> Vec<DependentSite> {
        self.inner.direct_dependents(element, new_type)
    }

    fn can_accept(&self, element: ElementId, new_type: &TypeRef) -> bool {
        !self.invalid.borrow().contains(&element) && self.inner.can_accept(element, new_type)
    }
}
