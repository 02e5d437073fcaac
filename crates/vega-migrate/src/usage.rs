use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use vega_model::ElementId;

/// One usage discovered during a migration session.
///
/// Identity is the wrapped element: two usages for the same element compare
/// equal and hash identically. The `excluded` flag is interior-mutable and
/// user-controlled; the labeler interns exactly one [`UsageHandle`] per
/// element per session, so every tree node referring to the same element
/// observes the same flag.
pub struct MigrationUsage {
    element: ElementId,
    excluded: Cell<bool>,
}

/// Shared handle to a [`MigrationUsage`].
///
/// Session state follows a single-writer discipline (the host serializes
/// expansions and exclude edits), so plain `Rc`/`Cell` sharing is sufficient.
pub type UsageHandle = Rc<MigrationUsage>;

impl MigrationUsage {
    pub(crate) fn new(element: ElementId) -> UsageHandle {
        Rc::new(Self {
            element,
            excluded: Cell::new(false),
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded.get()
    }

    pub fn set_excluded(&self, excluded: bool) {
        self.excluded.set(excluded);
    }
}

impl PartialEq for MigrationUsage {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
    }
}

impl Eq for MigrationUsage {}

impl Hash for MigrationUsage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.hash(state);
    }
}

impl fmt::Debug for MigrationUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUsage")
            .field("element", &self.element)
            .field("excluded", &self.excluded.get())
            .finish()
    }
}
