//! `strata render`: emit the canonical deployment plan.

use std::path::PathBuf;

use clap::Args;
use strata_compose::pipeline::{self, PipelineOptions};

/// Arguments for the `render` subcommand.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Write the plan to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the plan digest to stderr after rendering.
    #[arg(long)]
    pub digest: bool,
}

/// Executes the `render` command.
///
/// The plan YAML goes to stdout (or `--output`); the optional digest goes
/// to stderr so piped output stays parseable.
///
/// # Errors
///
/// Returns an error if composition fails or the output file cannot be
/// written.
pub fn execute(
    args: &RenderArgs,
    files: &[PathBuf],
    options: &PipelineOptions,
) -> anyhow::Result<()> {
    tracing::info!(files = files.len(), "rendering deployment plan");
    let plan = pipeline::compose_files(files, options)?;
    let rendered = plan.render()?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &rendered)?;
        println!("Plan written to {}", path.display());
    } else {
        print!("{rendered}");
    }

    if args.digest {
        eprintln!("sha256:{}", plan.digest()?);
    }

    Ok(())
}
