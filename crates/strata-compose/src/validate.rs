//! Merged-manifest validation.
//!
//! Runs after merging and secret resolution, on the canonical manifest:
//! every service must be runnable, every reference must name a defined
//! entity, dependent services must share a network with each dependency,
//! and the dependency graph must be acyclic. Checks run in that order and
//! stop at the first violation.

use strata_common::error::{Result, StrataError};

use crate::graph::DependencyGraph;
use crate::model::{Manifest, MountSource};

/// Validates a merged manifest.
///
/// # Errors
///
/// Returns [`StrataError::Schema`] for incomplete services and dangling
/// references, [`StrataError::UnreachableDependency`] when a dependency
/// shares no network with its dependent, and
/// [`StrataError::CyclicDependency`] when `depends_on` declarations loop.
pub fn validate(manifest: &Manifest) -> Result<()> {
    tracing::debug!(
        services = manifest.services.len(),
        "validating merged manifest"
    );
    ensure_runnable_services(manifest)?;
    ensure_references_exist(manifest)?;
    ensure_dependencies_reachable(manifest)?;
    DependencyGraph::from_manifest(manifest).ensure_acyclic()
}

/// A merged service must resolve to something to run.
fn ensure_runnable_services(manifest: &Manifest) -> Result<()> {
    for (name, service) in &manifest.services {
        if service.image.is_none() && service.build.is_none() {
            return Err(StrataError::Schema {
                message: format!("service \"{name}\" declares neither image nor build"),
            });
        }
    }
    Ok(())
}

fn ensure_references_exist(manifest: &Manifest) -> Result<()> {
    for (name, service) in &manifest.services {
        for dependency in &service.depends_on {
            if !manifest.services.contains_key(dependency) {
                return Err(StrataError::Schema {
                    message: format!(
                        "service \"{name}\" depends on undefined service \"{dependency}\""
                    ),
                });
            }
        }
        for network in &service.networks {
            if !manifest.networks.contains_key(network) {
                return Err(StrataError::Schema {
                    message: format!("service \"{name}\" joins undefined network \"{network}\""),
                });
            }
        }
        for mount in &service.volumes {
            if let MountSource::Named(volume) = &mount.source {
                if !manifest.volumes.contains_key(volume) {
                    return Err(StrataError::Schema {
                        message: format!(
                            "service \"{name}\" mounts undefined volume \"{volume}\""
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Containers resolve each other by name only on shared networks, so a
/// dependency on a service with no network in common can never be reached.
fn ensure_dependencies_reachable(manifest: &Manifest) -> Result<()> {
    for (name, service) in &manifest.services {
        for dependency in &service.depends_on {
            let Some(target) = manifest.services.get(dependency) else {
                continue;
            };
            if service.networks.is_disjoint(&target.networks) {
                return Err(StrataError::UnreachableDependency {
                    dependent: name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }
    Ok(())
}
