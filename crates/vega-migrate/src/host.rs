use std::collections::BTreeSet;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;

use vega_model::FileId;

use crate::labeler::TypeMigrationLabeler;
use crate::usage::UsageHandle;

#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Marker returned when a cancellable walk was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("change applier failed: {0}")]
    Failed(String),
}

/// Host environment collaborators: action boundaries, progress and the file
/// writability gate.
///
/// `run_read` must guarantee a read-only snapshot of the program model for
/// the duration of `f`; `run_write` is the mutually-exclusive command
/// boundary the final apply step runs under. The defaults run everything
/// inline, which is exactly what a headless host wants.
pub trait MigrationHost {
    fn run_read<T>(&self, f: impl FnOnce() -> T) -> T {
        f()
    }

    fn run_write<T>(&self, f: impl FnOnce() -> T) -> T {
        f()
    }

    /// Run a long-running walk with a progress surface. The token passed to
    /// `f` is the host's cancellation handle for this walk.
    fn run_with_progress<T>(
        &self,
        title: &str,
        cancellable: bool,
        f: impl FnOnce(&CancellationToken) -> Result<T, Cancelled>,
    ) -> Result<T, Cancelled> {
        let _ = (title, cancellable);
        f(&CancellationToken::new())
    }

    /// Must be checked before any edit is committed. Returning `false`
    /// aborts the whole operation with no partial writes.
    fn ensure_writable(&self, files: &BTreeSet<FileId>) -> bool {
        let _ = files;
        true
    }
}

/// Host that runs everything inline with no progress UI. Used by the CLI
/// and by tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessHost;

impl MigrationHost for HeadlessHost {}

/// Commits the final accepted usage set as one atomic edit.
pub trait ChangeApplier {
    fn apply(
        &mut self,
        usages: &[UsageHandle],
        labeler: &TypeMigrationLabeler<'_>,
    ) -> Result<(), ApplyError>;
}
