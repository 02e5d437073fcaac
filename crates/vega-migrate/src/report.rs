use serde::{Deserialize, Serialize};

use vega_model::{ElementId, FileId, TypeRef};

use crate::labeler::{FailedConversion, TypeMigrationLabeler};
use crate::session::MigrationSession;

/// Serializable snapshot of one migrated usage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratedUsageRecord {
    pub element: ElementId,
    pub name: String,
    pub file: Option<FileId>,
    pub from: Option<TypeRef>,
    pub to: TypeRef,
    pub excluded: bool,
}

/// Serializable snapshot of a whole migration session, used by the CLI's
/// `--json` output and by preview consumers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub migrated: Vec<MigratedUsageRecord>,
    pub failed: Vec<FailedConversion>,
}

impl MigrationReport {
    pub fn for_session(session: &MigrationSession<'_>) -> Self {
        let labeler = session.labeler();
        let model = labeler.model();
        let migrated = labeler
            .migrated()
            .iter()
            .map(|(usage, to)| {
                let element = usage.element();
                MigratedUsageRecord {
                    element,
                    name: model
                        .element_name(element)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("#{}", element.0)),
                    file: model.containing_file(element),
                    from: model.element_type(element),
                    to: to.clone(),
                    excluded: usage.is_excluded(),
                }
            })
            .collect();
        Self {
            migrated,
            failed: labeler.failed_usages().to_vec(),
        }
    }
}

/// Flat text lines describing every failed conversion, for conflict display.
pub fn failed_conversions_report(labeler: &TypeMigrationLabeler<'_>) -> Vec<String> {
    labeler
        .failed_usages()
        .iter()
        .map(|failure| match &failure.from {
            Some(from) => format!(
                "cannot convert usage `{}` from `{}` to `{}`",
                failure.name, from, failure.to
            ),
            None => format!(
                "cannot convert usage `{}` to `{}`",
                failure.name, failure.to
            ),
        })
        .collect()
}
