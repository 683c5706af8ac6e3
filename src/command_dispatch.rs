//! Purpose: Hold top-level CLI command dispatch for `taxon`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Flag validation (including `--format`) happens before the registry is opened.
//! Invariants: The record source is opened here and injected into the list operation.

use super::*;

use taxon::api::{ListOptions, RegistryRef, list_taxonomies, open_registry};
use taxon::notice::field_override_notice;
use tracing::debug;

pub(super) fn dispatch_command(
    command: Command,
    registry: Option<PathBuf>,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "taxon", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Taxonomy { command } => match command {
            TaxonomyCommand::List {
                filters,
                field,
                fields,
                format,
            } => {
                let options = ListOptions::from_flags(filters, field, fields.as_deref(), &format)?;
                if let (Some(field), Some(fields)) =
                    (&options.display.single_field, &options.display.fields)
                {
                    let time = notice_time_now().unwrap_or_default();
                    emit_notice(&field_override_notice(time, field, fields), color_mode);
                }

                let registry_ref = RegistryRef::from_option(registry.as_deref());
                debug!(
                    registry = ?registry_ref,
                    filters = options.filters.len(),
                    "opening registry"
                );
                let source = open_registry(&registry_ref)?;
                let listed = list_taxonomies(&source, &options)?;
                debug!(listed, "taxonomy list complete");
                Ok(RunOutcome::ok())
            }
        },
    }
}
