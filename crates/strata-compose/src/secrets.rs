//! Secret backing-file resolution.
//!
//! The only stage of the pipeline that touches the filesystem beyond
//! reading the manifests themselves. Every secret referenced by a service
//! must be defined and backed by an existing, non-empty regular file;
//! secrets that are defined but never referenced are left unchecked.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use strata_common::error::{Result, SecretProblem, StrataError};

use crate::model::{Manifest, Secret};

/// Verifies the backing files of all referenced secrets.
///
/// Relative backing paths are resolved against `project_dir`; error
/// messages keep the path as written in the manifest. Services and their
/// secret sets are walked in name order, so the first failure is
/// deterministic.
///
/// # Errors
///
/// Returns [`StrataError::Schema`] when a service references an undefined
/// secret and [`StrataError::MissingSecret`] when a backing file is
/// absent, empty, or not a readable regular file.
pub fn resolve(manifest: &Manifest, project_dir: &Path) -> Result<()> {
    let mut referenced: BTreeSet<&str> = BTreeSet::new();
    for (service_name, service) in &manifest.services {
        for secret in &service.secrets {
            if !manifest.secrets.contains_key(secret) {
                return Err(StrataError::Schema {
                    message: format!(
                        "service \"{service_name}\" references undefined secret \"{secret}\""
                    ),
                });
            }
            let _ = referenced.insert(secret);
        }
    }
    for name in referenced {
        check_backing_file(name, &manifest.secrets[name], project_dir)?;
    }
    Ok(())
}

fn check_backing_file(name: &str, secret: &Secret, project_dir: &Path) -> Result<()> {
    let resolved = if secret.file.is_absolute() {
        secret.file.clone()
    } else {
        project_dir.join(&secret.file)
    };
    tracing::debug!(secret = name, path = %resolved.display(), "checking secret backing file");
    let metadata = match fs::metadata(&resolved) {
        Ok(metadata) => metadata,
        Err(err) => {
            let problem = if err.kind() == io::ErrorKind::NotFound {
                SecretProblem::Absent
            } else {
                SecretProblem::Unreadable
            };
            return Err(missing(name, secret, problem));
        }
    };
    if !metadata.is_file() {
        return Err(missing(name, secret, SecretProblem::Unreadable));
    }
    if metadata.len() == 0 {
        return Err(missing(name, secret, SecretProblem::Empty));
    }
    warn_broad_access(name, &resolved, &metadata);
    Ok(())
}

fn missing(name: &str, secret: &Secret, problem: SecretProblem) -> StrataError {
    StrataError::MissingSecret {
        name: name.to_string(),
        path: secret.file.clone(),
        problem,
    }
}

#[cfg(unix)]
fn warn_broad_access(name: &str, path: &Path, metadata: &fs::Metadata) {
    use std::os::unix::fs::PermissionsExt;

    use strata_common::constants::SECRET_BROAD_ACCESS_MASK;

    let mode = metadata.permissions().mode();
    if mode & SECRET_BROAD_ACCESS_MASK != 0 {
        tracing::warn!(
            secret = name,
            path = %path.display(),
            mode = %format!("{:o}", mode & 0o777),
            "secret backing file is readable by group or others"
        );
    }
}

#[cfg(not(unix))]
fn warn_broad_access(_name: &str, _path: &Path, _metadata: &fs::Metadata) {}
