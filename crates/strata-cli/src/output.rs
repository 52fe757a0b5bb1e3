//! Formatted output helpers for CLI commands.
//!
//! Holds the machine-readable report shapes for `validate --format json`
//! and small presentation helpers shared by the human-readable commands.

use serde::Serialize;
use strata_common::error::StrataError;
use strata_compose::model::Manifest;

/// Horizontal rule used above plan listings.
#[must_use]
pub fn rule(width: usize) -> String {
    "\u{2550}".repeat(width)
}

/// Machine-readable success summary for `validate --format json`.
#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Number of services in the merged manifest.
    pub services: usize,
    /// Number of networks, including the implicit default when attached.
    pub networks: usize,
    /// Number of defined secrets.
    pub secrets: usize,
    /// Number of named volumes.
    pub volumes: usize,
}

impl ValidationSummary {
    /// Summarizes a validated manifest.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            status: "ok",
            services: manifest.services.len(),
            networks: manifest.networks.len(),
            secrets: manifest.secrets.len(),
            volumes: manifest.volumes.len(),
        }
    }
}

/// Machine-readable failure for `validate --format json`.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Always `"error"`.
    pub status: &'static str,
    /// Stable error kind tag, e.g. `port-conflict`.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl ErrorReport {
    /// Captures a pipeline error.
    #[must_use]
    pub fn from_error(err: &StrataError) -> Self {
        Self {
            status: "error",
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
