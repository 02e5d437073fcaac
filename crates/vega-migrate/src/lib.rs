//! Type-migration engine for Vega.
//!
//! Given a root element and a requested new type, the engine discovers every
//! usage whose type must change transitively, building a lazy, dedup-aware
//! dependency tree for user review, and drives the final atomic apply step
//! through host collaborators. This crate exposes:
//! - the fixpoint engine (`TypeMigrationLabeler`)
//! - the session tree with lazy expansion and exclusion (`MigrationSession`)
//! - target-type precondition validation (`validate_migration_type`)
//! - the run orchestrator (`TypeMigrationProcessor`)

mod host;
mod labeler;
mod processor;
mod report;
mod session;
mod usage;
mod validate;

pub use vega_model::TypeRef;

pub use host::{
    ApplyError, CancellationToken, Cancelled, ChangeApplier, HeadlessHost, MigrationHost,
};
pub use labeler::{FailedConversion, LabelerOptions, MigrateError, TypeMigrationLabeler};
pub use processor::{MigrationOutcome, ProcessorError, TypeMigrationProcessor};
pub use report::{failed_conversions_report, MigratedUsageRecord, MigrationReport};
pub use session::{MigrationSession, NodeId};
pub use usage::{MigrationUsage, UsageHandle};
pub use validate::{validate_migration_type, ValidationError};
