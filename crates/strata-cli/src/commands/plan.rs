//! `strata plan`: display the resolved startup plan.

use std::path::PathBuf;

use clap::Args;
use strata_compose::pipeline::{self, PipelineOptions};

use crate::output;

/// Arguments for the `plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {}

/// Executes the `plan` command.
///
/// Composes the manifests and lists every service in startup order with
/// the settings that matter at deploy time, followed by the plan digest.
///
/// # Errors
///
/// Returns an error if composition fails.
pub fn execute(
    _args: &PlanArgs,
    files: &[PathBuf],
    options: &PipelineOptions,
) -> anyhow::Result<()> {
    let plan = pipeline::compose_files(files, options)?;
    let manifest = plan.manifest();

    println!("Deployment plan from {} manifest file(s)", files.len());
    println!("{}", output::rule(46));
    println!();

    for (position, name) in plan.startup_order().iter().enumerate() {
        let Some(service) = manifest.services.get(name) else {
            continue;
        };
        println!("  {}. {name}", position + 1);
        if let Some(ref image) = service.image {
            println!("       image: {image}");
        }
        if let Some(ref build) = service.build {
            println!("       build: {}", build.context);
        }
        if !service.ports.is_empty() {
            let ports: Vec<String> = service.ports.iter().map(ToString::to_string).collect();
            println!("       ports: {}", ports.join(", "));
        }
        if !service.networks.is_empty() {
            let networks: Vec<&str> = service.networks.iter().map(String::as_str).collect();
            println!("       networks: {}", networks.join(", "));
        }
        if !service.depends_on.is_empty() {
            let after: Vec<&str> = service.depends_on.iter().map(String::as_str).collect();
            println!("       after: {}", after.join(", "));
        }
    }

    println!();
    println!(
        "  {} service(s) across {} network(s).",
        manifest.services.len(),
        manifest.networks.len()
    );
    println!("  plan digest: sha256:{}", plan.digest()?);

    Ok(())
}
