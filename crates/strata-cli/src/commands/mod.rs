//! CLI command definitions and dispatch.

pub mod plan;
pub mod render;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_compose::pipeline::PipelineOptions;

/// Strata: layered manifest composer producing deterministic deployment plans.
#[derive(Parser, Debug)]
#[command(name = strata_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Manifest file, merged in the order given; repeatable.
    #[arg(short = 'f', long = "file", global = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Directory secret paths resolve against; defaults to the first
    /// manifest's directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub project_directory: Option<PathBuf>,

    /// Skip secret backing-file checks.
    #[arg(long, global = true)]
    pub no_secrets: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the merged deployment plan as canonical YAML.
    Render(render::RenderArgs),
    /// Check manifests and report the result without emitting a plan.
    Validate(validate::ValidateArgs),
    /// Display the resolved startup plan in human-readable form.
    Plan(plan::PlanArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if no manifest file can be found or if the command
/// execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let files = resolve_manifest_files(&cli.files)?;
    let options = PipelineOptions {
        project_dir: cli.project_directory,
        check_secrets: !cli.no_secrets,
    };
    match cli.command {
        Command::Render(args) => render::execute(&args, &files, &options),
        Command::Validate(args) => validate::execute(&args, &files, &options),
        Command::Plan(args) => plan::execute(&args, &files, &options),
    }
}

/// Uses the `-f` files as given, or probes the default manifest names in
/// the current directory.
fn resolve_manifest_files(given: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    if !given.is_empty() {
        return Ok(given.to_vec());
    }
    for name in strata_common::constants::DEFAULT_MANIFEST_FILES {
        let candidate = PathBuf::from(name);
        if candidate.exists() {
            return Ok(vec![candidate]);
        }
    }
    anyhow::bail!(
        "no manifest file found; looked for {}",
        strata_common::constants::DEFAULT_MANIFEST_FILES.join(", ")
    )
}
