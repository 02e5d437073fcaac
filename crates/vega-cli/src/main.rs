use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use vega_migrate::{
    failed_conversions_report, ApplyError, CancellationToken, ChangeApplier, HeadlessHost,
    MigrationOutcome, MigrationReport, TypeMigrationLabeler, TypeMigrationProcessor, TypeRef,
    UsageHandle,
};
use vega_model::{MemoryModel, ProgramDescription, ProgramModel};

#[derive(Parser)]
#[command(name = "vega", version, about = "Vega type-migration engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a type migration over a program-model description
    Migrate(MigrateArgs),
    /// Check whether a type is a valid migration target
    Validate(ValidateArgs),
}

#[derive(Args)]
struct MigrateArgs {
    /// Path to a JSON program-model description
    #[arg(long)]
    model: PathBuf,
    /// Name of the root element to migrate
    root: String,
    /// The target type
    #[arg(long = "to")]
    target_type: String,
    /// Element names to exclude from the final apply
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
    /// Compute and print the report without applying
    #[arg(long)]
    dry_run: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// The candidate target type
    target_type: String,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Migrate(args) => migrate(args),
        Command::Validate(args) => validate(args),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Prints each accepted substitution; the in-memory model has no text to
/// edit, so printing is the CLI's "commit".
struct PrintApplier;

impl ChangeApplier for PrintApplier {
    fn apply(
        &mut self,
        usages: &[UsageHandle],
        labeler: &TypeMigrationLabeler<'_>,
    ) -> Result<(), ApplyError> {
        let model = labeler.model();
        for (usage, ty) in labeler.migrated() {
            if !usages.contains(usage) {
                continue;
            }
            let element = usage.element();
            let name = model.element_name(element).unwrap_or("<unknown>");
            match model.element_type(element) {
                Some(from) => println!("{name}: {from} -> {ty}"),
                None => println!("{name}: -> {ty}"),
            }
        }
        Ok(())
    }
}

fn migrate(args: MigrateArgs) -> Result<()> {
    let text = fs::read_to_string(&args.model)
        .with_context(|| format!("reading model description {}", args.model.display()))?;
    let description: ProgramDescription =
        serde_json::from_str(&text).context("parsing model description")?;
    let model = MemoryModel::from_description(&description).context("building program model")?;

    let Some(root) = model.find_element(&args.root) else {
        bail!("unknown root element `{}`", args.root);
    };

    let mut processor =
        TypeMigrationProcessor::new(&model, root, TypeRef::new(&args.target_type))?;

    // Materialize the whole tree, then apply the exclusions by element name.
    // Exclusions given on the command line never prune subtrees: discovery
    // has already happened by the time they are set.
    processor
        .session_mut()
        .expand_all(&CancellationToken::new())?;
    for name in &args.exclude {
        let Some(element) = model.find_element(name) else {
            bail!("unknown excluded element `{name}`");
        };
        match processor.session().labeler().usage(element) {
            Some(usage) => usage.set_excluded(true),
            None => {
                tracing::debug!(name = %name, "excluded element is not part of the migration")
            }
        }
    }

    if args.dry_run {
        let report = MigrationReport::for_session(processor.session());
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", processor.session().labeler().migration_report());
        }
        return Ok(());
    }

    let outcome = processor.run(&HeadlessHost, &mut PrintApplier)?;
    match outcome {
        MigrationOutcome::Applied { usages, files } => {
            if args.json {
                let report = MigrationReport::for_session(processor.session());
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            eprintln!("migrated {} usages across {} files", usages.len(), files.len());
        }
        MigrationOutcome::ReadOnlyAbort { files } => {
            bail!("{} affected files are read-only, nothing applied", files.len());
        }
        MigrationOutcome::Cancelled => {
            bail!("migration cancelled");
        }
    }

    for line in failed_conversions_report(processor.session().labeler()) {
        eprintln!("{line}");
    }
    Ok(())
}

fn validate(args: ValidateArgs) -> Result<()> {
    let ty = TypeRef::new(&args.target_type);
    vega_migrate::validate_migration_type(&ty)?;
    println!("`{ty}` is a valid migration target");
    Ok(())
}
