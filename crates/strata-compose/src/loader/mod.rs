//! Manifest document loading.
//!
//! Reads YAML text, deserializes it into the raw [`document`] types, and
//! lowers the result into the typed [`crate::model`] form with every
//! shorthand expanded. Each file yields one fragment; combining fragments
//! is the merge module's job.

pub mod document;
pub mod shorthand;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};

use self::document::{
    BuildDoc, CommandDoc, DependsOnDoc, EnvDoc, ManifestDoc, NetworkDoc, PortDoc, SecretDoc,
    ServiceDoc, VolumeDoc,
};
use crate::model::{
    BuildSpec, CommandSpec, Manifest, Network, PortBinding, Protocol, RestartPolicy, Secret,
    Service, Volume,
};

/// Conditions accepted in long-form `depends_on` entries.
const DEPENDS_ON_CONDITIONS: [&str; 3] = [
    "service_started",
    "service_healthy",
    "service_completed_successfully",
];

/// Loads and lowers one manifest document from disk.
///
/// # Errors
///
/// Returns [`StrataError::Io`] if the file cannot be read, and a parse or
/// schema error if its content is rejected.
pub fn load_file(path: &Path) -> Result<Manifest> {
    tracing::debug!(path = %path.display(), "loading manifest document");
    let source = fs::read_to_string(path).map_err(|source| StrataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&source, path)
}

/// Lowers manifest YAML text into a typed fragment.
///
/// `origin` labels parse errors. An empty or null document yields an empty
/// fragment, so a blank overlay file is a no-op.
///
/// # Errors
///
/// Returns [`StrataError::Parse`] for ill-formed YAML or schema-shape
/// violations, [`StrataError::Shorthand`] for malformed shorthand strings,
/// and [`StrataError::Schema`] for structurally valid but meaningless
/// declarations.
pub fn load_str(source: &str, origin: &Path) -> Result<Manifest> {
    let doc: Option<ManifestDoc> =
        serde_yaml::from_str(source).map_err(|source| StrataError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
    convert(doc.unwrap_or_default())
}

fn convert(doc: ManifestDoc) -> Result<Manifest> {
    if doc.version.is_some() {
        tracing::debug!("ignoring legacy version key");
    }
    let mut manifest = Manifest::default();
    for (name, body) in doc.services.unwrap_or_default() {
        ensure_name("service", &name)?;
        let service = convert_service(&name, body.unwrap_or_default())?;
        let _ = manifest.services.insert(name, service);
    }
    for (name, body) in doc.networks.unwrap_or_default() {
        ensure_name("network", &name)?;
        let network = convert_network(body.unwrap_or_default());
        let _ = manifest.networks.insert(name, network);
    }
    for (name, body) in doc.secrets.unwrap_or_default() {
        ensure_name("secret", &name)?;
        let secret = convert_secret(&name, body.unwrap_or_default())?;
        let _ = manifest.secrets.insert(name, secret);
    }
    for (name, body) in doc.volumes.unwrap_or_default() {
        ensure_name("volume", &name)?;
        let volume = convert_volume(body.unwrap_or_default());
        let _ = manifest.volumes.insert(name, volume);
    }
    Ok(manifest)
}

/// Entity names start with an ASCII letter or digit and continue with
/// letters, digits, `_`, `.`, or `-`.
fn ensure_name(kind: &'static str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|first| {
        first.is_ascii_alphanumeric()
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    });
    if valid {
        Ok(())
    } else {
        Err(StrataError::Schema {
            message: format!("invalid {kind} name \"{name}\""),
        })
    }
}

fn convert_service(name: &str, doc: ServiceDoc) -> Result<Service> {
    let mut service = Service {
        image: doc.image,
        ..Service::default()
    };
    if let Some(build) = doc.build {
        service.build = Some(convert_build(name, build)?);
    }
    service.command = doc.command.map(|command| match command {
        CommandDoc::Shell(line) => CommandSpec::Shell(line),
        CommandDoc::Exec(argv) => CommandSpec::Exec(argv),
    });
    if let Some(raw) = doc.restart {
        let policy = RestartPolicy::parse(&raw).ok_or_else(|| StrataError::Shorthand {
            service: name.to_string(),
            field: "restart",
            value: raw,
        })?;
        service.restart = Some(policy);
    }
    if let Some(env) = doc.environment {
        service.environment = convert_environment(name, env)?;
    }
    if let Some(files) = doc.env_file {
        service.env_file = files.into_vec().into_iter().map(PathBuf::from).collect();
    }
    for entry in doc.ports.unwrap_or_default() {
        service.ports.push(convert_port(name, entry)?);
    }
    for entry in doc.volumes.unwrap_or_default() {
        let mount = shorthand::mount(&entry).ok_or_else(|| StrataError::Shorthand {
            service: name.to_string(),
            field: "volumes",
            value: entry,
        })?;
        service.volumes.push(mount);
    }
    service.networks = doc.networks.unwrap_or_default().into_iter().collect();
    service.secrets = doc.secrets.unwrap_or_default().into_iter().collect();
    if let Some(deps) = doc.depends_on {
        service.depends_on = convert_depends_on(name, deps)?;
    }
    Ok(service)
}

fn convert_build(service: &str, doc: BuildDoc) -> Result<BuildSpec> {
    match doc {
        BuildDoc::Context(context) => Ok(BuildSpec {
            context,
            dockerfile: None,
            args: BTreeMap::new(),
        }),
        BuildDoc::Detailed(detail) => {
            let mut args = BTreeMap::new();
            for (key, value) in detail.args {
                let value = value.into_string().ok_or_else(|| StrataError::Schema {
                    message: format!(
                        "build arg \"{key}\" of service \"{service}\" must not be null"
                    ),
                })?;
                let _ = args.insert(key, value);
            }
            Ok(BuildSpec {
                context: detail.context,
                dockerfile: detail.dockerfile,
                args,
            })
        }
    }
}

fn convert_environment(service: &str, doc: EnvDoc) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    match doc {
        EnvDoc::Map(entries) => {
            for (key, value) in entries {
                let value = value.into_string().ok_or_else(|| StrataError::Schema {
                    message: format!(
                        "environment variable \"{key}\" of service \"{service}\" must not be null"
                    ),
                })?;
                let _ = env.insert(key, value);
            }
        }
        EnvDoc::List(entries) => {
            // Later entries overwrite earlier ones for the same key.
            for entry in entries {
                let Some((key, value)) = entry.split_once('=') else {
                    return Err(StrataError::Shorthand {
                        service: service.to_string(),
                        field: "environment",
                        value: entry,
                    });
                };
                let _ = env.insert(key.to_string(), value.to_string());
            }
        }
    }
    Ok(env)
}

fn convert_port(service: &str, doc: PortDoc) -> Result<PortBinding> {
    match doc {
        PortDoc::Number(container) => {
            if container == 0 {
                return Err(StrataError::Shorthand {
                    service: service.to_string(),
                    field: "ports",
                    value: "0".to_string(),
                });
            }
            Ok(PortBinding {
                host_ip: None,
                host: None,
                container,
                protocol: Protocol::Tcp,
            })
        }
        PortDoc::Shorthand(raw) => shorthand::port(&raw).ok_or_else(|| StrataError::Shorthand {
            service: service.to_string(),
            field: "ports",
            value: raw,
        }),
    }
}

fn convert_depends_on(service: &str, doc: DependsOnDoc) -> Result<BTreeSet<String>> {
    match doc {
        DependsOnDoc::List(names) => Ok(names.into_iter().collect()),
        DependsOnDoc::Conditioned(entries) => {
            let mut names = BTreeSet::new();
            for (dependency, detail) in entries {
                if let Some(condition) = detail.and_then(|d| d.condition) {
                    if !DEPENDS_ON_CONDITIONS.contains(&condition.as_str()) {
                        return Err(StrataError::Schema {
                            message: format!(
                                "unknown depends_on condition \"{condition}\" for service \"{service}\""
                            ),
                        });
                    }
                }
                let _ = names.insert(dependency);
            }
            Ok(names)
        }
    }
}

fn convert_network(doc: NetworkDoc) -> Network {
    Network {
        driver: doc.driver,
        external: doc.external,
    }
}

fn convert_secret(name: &str, doc: SecretDoc) -> Result<Secret> {
    match doc.file {
        Some(file) if !file.is_empty() => Ok(Secret {
            file: PathBuf::from(file),
        }),
        _ => Err(StrataError::Schema {
            message: format!("secret \"{name}\" must declare a backing file"),
        }),
    }
}

fn convert_volume(doc: VolumeDoc) -> Volume {
    Volume { driver: doc.driver }
}
