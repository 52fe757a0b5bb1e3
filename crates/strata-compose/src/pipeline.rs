//! End-to-end composition pipeline.
//!
//! Wires the stages together in their fixed order: load every manifest
//! file, merge the fragments, resolve secret backing files, validate the
//! merged manifest, and assemble the plan. The first failing stage aborts
//! the run.

use std::path::{Path, PathBuf};

use strata_common::error::Result;

use crate::plan::Plan;
use crate::{loader, merge, secrets, validate};

/// Knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory secret paths resolve against; the directory of the first
    /// manifest file when unset.
    pub project_dir: Option<PathBuf>,
    /// Whether secret backing files are checked.
    pub check_secrets: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            project_dir: None,
            check_secrets: true,
        }
    }
}

/// Composes a deployment plan from manifest files, in declaration order.
///
/// # Errors
///
/// Propagates the first stage failure: I/O and parse errors from loading,
/// port conflicts from merging, secret failures from resolution, reference
/// and graph errors from validation.
pub fn compose_files(paths: &[PathBuf], options: &PipelineOptions) -> Result<Plan> {
    tracing::debug!(files = paths.len(), "composing deployment plan");
    let mut fragments = Vec::with_capacity(paths.len());
    for path in paths {
        fragments.push(loader::load_file(path)?);
    }
    let merged = merge::merge(fragments)?;
    if options.check_secrets {
        let project_dir = resolve_project_dir(paths, options);
        secrets::resolve(&merged, &project_dir)?;
    }
    validate::validate(&merged)?;
    Plan::from_manifest(merged)
}

fn resolve_project_dir(paths: &[PathBuf], options: &PipelineOptions) -> PathBuf {
    options.project_dir.clone().unwrap_or_else(|| {
        paths
            .first()
            .and_then(|path| path.parent())
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    })
}
