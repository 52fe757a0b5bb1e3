//! `strata validate`: check manifests and report the result.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use strata_compose::pipeline::{self, PipelineOptions};

use crate::output::{ErrorReport, ValidationSummary};

/// Output format for validation results.
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum Format {
    /// Human-readable one-liner.
    #[default]
    Text,
    /// Machine-readable JSON on stdout.
    Json,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Result format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Executes the `validate` command.
///
/// With `--format json` the verdict is printed to stdout in both the
/// success and the failure case; the failure is still propagated so the
/// process exits non-zero.
///
/// # Errors
///
/// Returns the first pipeline failure.
pub fn execute(
    args: &ValidateArgs,
    files: &[PathBuf],
    options: &PipelineOptions,
) -> anyhow::Result<()> {
    match pipeline::compose_files(files, options) {
        Ok(plan) => {
            match args.format {
                Format::Text => {
                    let manifest = plan.manifest();
                    println!(
                        "OK: {} service(s), {} network(s), startup order resolved.",
                        manifest.services.len(),
                        manifest.networks.len()
                    );
                }
                Format::Json => {
                    let summary = ValidationSummary::from_manifest(plan.manifest());
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
            }
            Ok(())
        }
        Err(err) => {
            if matches!(args.format, Format::Json) {
                let report = ErrorReport::from_error(&err);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Err(err.into())
        }
    }
}
