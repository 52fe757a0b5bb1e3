//! Unified error types for the strata workspace.
//!
//! Every pipeline failure is an authoring mistake in the manifests, not a
//! transient fault, so no variant is ever retried internally. Each variant
//! carries the offending service, secret, or network name so the message is
//! actionable without re-running at a higher verbosity.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StrataError {
    /// An I/O operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A manifest document is not well-formed YAML or does not match the
    /// document schema.
    #[error("malformed manifest {}: {source}", path.display())]
    Parse {
        /// Document that failed to parse.
        path: PathBuf,
        /// Underlying deserialization error.
        source: serde_yaml::Error,
    },

    /// A compose shorthand string (port binding, volume mount, restart
    /// policy) does not match its grammar.
    #[error("service \"{service}\": invalid {field} \"{value}\"")]
    Shorthand {
        /// Service the value belongs to.
        service: String,
        /// Field the value was supplied for.
        field: &'static str,
        /// The offending string as written.
        value: String,
    },

    /// A required field is missing or a reference names an undefined entity.
    #[error("manifest schema violation: {message}")]
    Schema {
        /// Description of the violated rule.
        message: String,
    },

    /// Two distinct services publish the same host port.
    #[error("host port {port} published by both \"{first}\" and \"{second}\"")]
    PortConflict {
        /// The contested host port.
        port: u16,
        /// Name of the service that published the port first.
        first: String,
        /// Name of the service that published it again.
        second: String,
    },

    /// A referenced secret's backing file is absent, empty, or unreadable.
    #[error("secret \"{name}\": backing file {} {problem}", path.display())]
    MissingSecret {
        /// Name of the secret.
        name: String,
        /// Expected backing file path.
        path: PathBuf,
        /// What is wrong with the backing file.
        problem: SecretProblem,
    },

    /// A service depends on another service with which it shares no network.
    #[error("service \"{dependent}\" depends on \"{dependency}\" but they share no network")]
    UnreachableDependency {
        /// The service declaring the dependency.
        dependent: String,
        /// The service depended upon.
        dependency: String,
    },

    /// The service dependency graph contains a cycle.
    #[error("cyclic service dependency: {}", render_cycle(cycle))]
    CyclicDependency {
        /// The services forming the cycle, in traversal order.
        cycle: Vec<String>,
    },

    /// Rendering the merged plan to YAML failed.
    #[error("plan serialization failed: {source}")]
    Serialization {
        /// Underlying emitter error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl StrataError {
    /// Stable machine-readable tag for this error kind.
    ///
    /// Shorthand failures report as `parse`: both describe input that does
    /// not match the manifest grammar.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Parse { .. } | Self::Shorthand { .. } => "parse",
            Self::Schema { .. } => "schema",
            Self::PortConflict { .. } => "port-conflict",
            Self::MissingSecret { .. } => "missing-secret",
            Self::UnreachableDependency { .. } => "unreachable-dependency",
            Self::CyclicDependency { .. } => "cyclic-dependency",
            Self::Serialization { .. } => "serialization",
        }
    }
}

/// Why a secret's backing file was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretProblem {
    /// The file does not exist.
    Absent,
    /// The file exists but is zero bytes long.
    Empty,
    /// The file exists but its metadata could not be read.
    Unreadable,
}

impl fmt::Display for SecretProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "does not exist"),
            Self::Empty => write!(f, "is empty"),
            Self::Unreadable => write!(f, "is not readable"),
        }
    }
}

/// Renders a cycle as `a -> b -> c -> a`, closing the loop on the first node.
fn render_cycle(cycle: &[String]) -> String {
    let mut out = cycle.join(" -> ");
    if let Some(first) = cycle.first() {
        out.push_str(" -> ");
        out.push_str(first);
    }
    out
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StrataError>;
