//! Typed manifest model shared by the loader, merger, and plan emitter.
//!
//! A [`Manifest`] holds the four entity collections keyed by name. The same
//! type serves as a *fragment* (one parsed document, possibly partial) and
//! as the merged result; completeness is only enforced on the merged form.
//! All collections are B-tree keyed so iteration order, and therefore
//! emission order, is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A declarative description of services, networks, secrets, and volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Services keyed by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Service>,
    /// Networks keyed by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Network>,
    /// File-backed secrets keyed by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, Secret>,
    /// Named volumes keyed by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Volume>,
}

/// One service definition.
///
/// `image` and `build` are both optional so that a fragment may declare a
/// service partially; the merged manifest must supply at least one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Service {
    /// Image reference to run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build instructions, as an alternative or supplement to `image`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    /// Command overriding the image default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSpec>,
    /// Restart policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<RestartPolicy>,
    /// Environment variables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Environment files, applied in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_file: Vec<PathBuf>,
    /// Published and exposed ports.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortBinding>,
    /// Volume and bind mounts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Mount>,
    /// Networks this service joins.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub networks: BTreeSet<String>,
    /// Secrets mounted into this service.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub secrets: BTreeSet<String>,
    /// Services this service depends on.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
}

/// Build instructions for a service image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Build context directory.
    pub context: String,
    /// Dockerfile path relative to the context.
    pub dockerfile: Option<String>,
    /// Build arguments.
    pub args: BTreeMap<String, String>,
}

impl Serialize for BuildSpec {
    /// Emits the compact string form when only a context is set, the map
    /// form otherwise.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.dockerfile.is_none() && self.args.is_empty() {
            return serializer.serialize_str(&self.context);
        }
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("context", &self.context)?;
        if let Some(ref dockerfile) = self.dockerfile {
            map.serialize_entry("dockerfile", dockerfile)?;
        }
        if !self.args.is_empty() {
            map.serialize_entry("args", &self.args)?;
        }
        map.end()
    }
}

/// Service command in shell or exec form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// A single shell string.
    Shell(String),
    /// An argument vector.
    Exec(Vec<String>),
}

impl Serialize for CommandSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Shell(line) => serializer.serialize_str(line),
            Self::Exec(argv) => argv.serialize(serializer),
        }
    }
}

/// Container restart policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart.
    No,
    /// Always restart.
    Always,
    /// Restart unless explicitly stopped.
    UnlessStopped,
    /// Restart on non-zero exit, optionally bounded.
    OnFailure {
        /// Maximum restart attempts, unbounded when absent.
        max_retries: Option<u32>,
    },
}

impl RestartPolicy {
    /// Parses the compose restart-policy string.
    ///
    /// Accepts `no`, `always`, `unless-stopped`, `on-failure`, and
    /// `on-failure:<max>`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "no" => Some(Self::No),
            "always" => Some(Self::Always),
            "unless-stopped" => Some(Self::UnlessStopped),
            "on-failure" => Some(Self::OnFailure { max_retries: None }),
            other => {
                let max = other.strip_prefix("on-failure:")?;
                let max: u32 = max.parse().ok()?;
                Some(Self::OnFailure {
                    max_retries: Some(max),
                })
            }
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::No => write!(f, "no"),
            Self::Always => write!(f, "always"),
            Self::UnlessStopped => write!(f, "unless-stopped"),
            Self::OnFailure { max_retries: None } => write!(f, "on-failure"),
            Self::OnFailure {
                max_retries: Some(max),
            } => write!(f, "on-failure:{max}"),
        }
    }
}

impl Serialize for RestartPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Transport protocol of a port binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Protocol {
    /// TCP (the default).
    #[default]
    Tcp,
    /// UDP.
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// A published (`host:container`) or exposed (`container`-only) port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    /// Host interface to bind, all interfaces when absent.
    pub host_ip: Option<Ipv4Addr>,
    /// Host port; the binding is container-only when absent.
    pub host: Option<u16>,
    /// Container port.
    pub container: u16,
    /// Transport protocol.
    pub protocol: Protocol,
}

impl fmt::Display for PortBinding {
    /// Renders the shorthand form, omitting the default `/tcp` suffix.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = self.host_ip {
            write!(f, "{ip}:")?;
        }
        if let Some(host) = self.host {
            write!(f, "{host}:")?;
        }
        write!(f, "{}", self.container)?;
        if self.protocol == Protocol::Udp {
            write!(f, "/udp")?;
        }
        Ok(())
    }
}

impl Serialize for PortBinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Source side of a service mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSource {
    /// A top-level named volume.
    Named(String),
    /// A host path (starts with `.`, `/`, or `~`).
    Bind(PathBuf),
    /// No source: an anonymous volume managed by the runtime.
    Anonymous,
}

/// A volume or bind mount attached to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Where the data comes from.
    pub source: MountSource,
    /// Absolute path inside the container.
    pub target: String,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // An anonymous mount has no source segment and therefore no place
        // for a mode suffix; the loader never builds one with read_only set.
        match &self.source {
            MountSource::Named(name) => write!(f, "{name}:{}", self.target)?,
            MountSource::Bind(path) => write!(f, "{}:{}", path.display(), self.target)?,
            MountSource::Anonymous => return write!(f, "{}", self.target),
        }
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

impl Serialize for Mount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A named network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Network {
    /// Network driver, `bridge` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Whether the network is managed outside this manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
}

/// A file-backed secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Secret {
    /// Backing file, resolved against the project directory when relative.
    pub file: PathBuf,
}

/// A named volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Volume {
    /// Volume driver, runtime default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}
