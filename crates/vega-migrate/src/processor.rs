use std::collections::BTreeSet;

use thiserror::Error;

use vega_model::{ElementId, FileId, ProgramModel, TypeRef};

use crate::host::{ApplyError, ChangeApplier, MigrationHost};
use crate::labeler::{LabelerOptions, MigrateError};
use crate::session::MigrationSession;
use crate::usage::UsageHandle;
use crate::validate::{validate_migration_type, ValidationError};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    InvalidTargetType(#[from] ValidationError),
    #[error(transparent)]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Terminal state of one processor run.
#[derive(Debug)]
pub enum MigrationOutcome {
    /// The accepted usage set was handed to the change applier.
    Applied {
        usages: Vec<UsageHandle>,
        files: BTreeSet<FileId>,
    },
    /// At least one affected file could not be made writable; nothing was
    /// applied.
    ReadOnlyAbort { files: BTreeSet<FileId> },
    /// The expansion walk was cancelled; nothing was applied.
    Cancelled,
}

/// Orchestrates a full migration run: forced expansion under the host's
/// read/progress boundaries, writability check, then one atomic apply.
#[derive(Debug)]
pub struct TypeMigrationProcessor<'m> {
    session: MigrationSession<'m>,
}

impl<'m> TypeMigrationProcessor<'m> {
    /// Validates the target type (a rejected type is a hard precondition
    /// failure: the engine never starts) and seeds the session.
    pub fn new(
        model: &'m dyn ProgramModel,
        root_element: ElementId,
        target_type: TypeRef,
    ) -> Result<Self, ProcessorError> {
        Self::with_options(model, root_element, target_type, LabelerOptions::default())
    }

    pub fn with_options(
        model: &'m dyn ProgramModel,
        root_element: ElementId,
        target_type: TypeRef,
        options: LabelerOptions,
    ) -> Result<Self, ProcessorError> {
        validate_migration_type(&target_type)?;
        let session = MigrationSession::with_options(model, root_element, target_type, options)?;
        Ok(Self { session })
    }

    /// The underlying session, for interactive inspection and exclude edits
    /// before [`run`](Self::run).
    pub fn session(&self) -> &MigrationSession<'m> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MigrationSession<'m> {
        &mut self.session
    }

    pub fn run(
        &mut self,
        host: &impl MigrationHost,
        applier: &mut impl ChangeApplier,
    ) -> Result<MigrationOutcome, ProcessorError> {
        let session = &mut self.session;
        let walk = host.run_with_progress("Type migration", true, |token| {
            host.run_read(|| session.expand_all(token))
        });
        if walk.is_err() {
            tracing::debug!("migration walk cancelled");
            return Ok(MigrationOutcome::Cancelled);
        }

        let usages = self.session.collect_accepted();
        let files = self.session.affected_files();
        if !host.ensure_writable(&files) {
            tracing::debug!(files = files.len(), "writability refused, aborting");
            return Ok(MigrationOutcome::ReadOnlyAbort { files });
        }

        host.run_write(|| applier.apply(&usages, self.session.labeler()))?;
        tracing::debug!(usages = usages.len(), files = files.len(), "migration applied");
        Ok(MigrationOutcome::Applied { usages, files })
    }
}
