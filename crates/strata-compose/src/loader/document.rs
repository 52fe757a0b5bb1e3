//! Raw document types mirroring the on-disk YAML schema.
//!
//! These types accept the flexible surface forms the format allows
//! (map-or-list environments, string-or-struct builds, numeric-or-string
//! ports, null section bodies) and nothing else: every struct denies
//! unknown fields so a typo fails the parse instead of being dropped.
//! The loader converts them into the typed [`crate::model`] form.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One parsed manifest document, prior to shorthand expansion.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestDoc {
    /// Legacy schema marker, accepted and ignored.
    pub version: Option<serde_yaml::Value>,
    /// Service definitions; a null body declares an empty partial service.
    pub services: Option<BTreeMap<String, Option<ServiceDoc>>>,
    /// Network definitions; a null body takes every default.
    pub networks: Option<BTreeMap<String, Option<NetworkDoc>>>,
    /// Secret definitions.
    pub secrets: Option<BTreeMap<String, Option<SecretDoc>>>,
    /// Volume definitions; a null body takes every default.
    pub volumes: Option<BTreeMap<String, Option<VolumeDoc>>>,
}

/// Raw service body.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDoc {
    /// Image reference.
    pub image: Option<String>,
    /// Build instructions.
    pub build: Option<BuildDoc>,
    /// Command override.
    pub command: Option<CommandDoc>,
    /// Restart policy string.
    pub restart: Option<String>,
    /// Environment declarations.
    pub environment: Option<EnvDoc>,
    /// Environment file paths.
    pub env_file: Option<StringOrList>,
    /// Port entries.
    pub ports: Option<Vec<PortDoc>>,
    /// Mount shorthand strings.
    pub volumes: Option<Vec<String>>,
    /// Networks joined.
    pub networks: Option<Vec<String>>,
    /// Secrets referenced.
    pub secrets: Option<Vec<String>>,
    /// Dependency declarations.
    pub depends_on: Option<DependsOnDoc>,
}

/// A port entry: a bare container port or a shorthand string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PortDoc {
    /// Container port only.
    Number(u16),
    /// `[ip:][host:]container[/proto]` string.
    Shorthand(String),
}

/// A command in shell-string or argument-vector form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CommandDoc {
    /// Single shell string.
    Shell(String),
    /// Argument vector.
    Exec(Vec<String>),
}

/// Build instructions: a bare context path or a full object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BuildDoc {
    /// Context directory only.
    Context(String),
    /// Full build object.
    Detailed(BuildDetailDoc),
}

/// Long-form build object.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDetailDoc {
    /// Build context directory, `.` when omitted.
    #[serde(default = "default_build_context")]
    pub context: String,
    /// Dockerfile path relative to the context.
    pub dockerfile: Option<String>,
    /// Build arguments.
    #[serde(default)]
    pub args: BTreeMap<String, EnvScalar>,
}

fn default_build_context() -> String {
    ".".to_string()
}

/// Environment declarations in map or `KEY=value` list form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnvDoc {
    /// Key-to-scalar map.
    Map(BTreeMap<String, EnvScalar>),
    /// `KEY=value` entries.
    List(Vec<String>),
}

/// A scalar environment or build-arg value as YAML allows it to be spelled.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnvScalar {
    /// YAML boolean.
    Bool(bool),
    /// YAML integer.
    Int(i64),
    /// YAML float.
    Float(f64),
    /// Quoted or plain string.
    Text(String),
    /// Explicit or implicit null.
    Null,
}

impl EnvScalar {
    /// Coerces the scalar to its string form; `None` for null.
    #[must_use]
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Bool(flag) => Some(flag.to_string()),
            Self::Int(number) => Some(number.to_string()),
            Self::Float(number) => Some(number.to_string()),
            Self::Text(text) => Some(text),
            Self::Null => None,
        }
    }
}

/// A field that accepts one string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// Single entry.
    One(String),
    /// Ordered list.
    Many(Vec<String>),
}

impl StringOrList {
    /// Normalizes to a list, preserving order.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

/// Dependency declarations: a plain list or a map with per-entry detail.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DependsOnDoc {
    /// Plain service-name list.
    List(Vec<String>),
    /// Map with optional per-dependency detail.
    Conditioned(BTreeMap<String, Option<DependsOnDetailDoc>>),
}

/// Long-form dependency entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependsOnDetailDoc {
    /// Startup condition; checked against the known set by the loader.
    pub condition: Option<String>,
}

/// Raw network body.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkDoc {
    /// Network driver.
    pub driver: Option<String>,
    /// Whether the network is managed outside this manifest.
    pub external: Option<bool>,
}

/// Raw secret body.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretDoc {
    /// Backing file path.
    pub file: Option<String>,
}

/// Raw volume body.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeDoc {
    /// Volume driver.
    pub driver: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ManifestDoc {
        serde_yaml::from_str(source).expect("should deserialize")
    }

    #[test]
    fn environment_map_with_mixed_scalars() {
        let doc = parse(
            "services:\n  db:\n    environment:\n      POSTGRES_DB: metrics\n      POSTGRES_PORT: 5432\n      DEBUG: true\n",
        );
        let services = doc.services.expect("services present");
        let db = services["db"].as_ref().expect("db body");
        let Some(EnvDoc::Map(env)) = &db.environment else {
            panic!("expected map form");
        };
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn environment_list_form() {
        let doc = parse("services:\n  db:\n    environment:\n      - POSTGRES_DB=metrics\n");
        let services = doc.services.expect("services present");
        let db = services["db"].as_ref().expect("db body");
        assert!(matches!(db.environment, Some(EnvDoc::List(_))));
    }

    #[test]
    fn ports_numeric_and_string() {
        let doc = parse("services:\n  web:\n    ports:\n      - 8080\n      - \"8443:443\"\n");
        let services = doc.services.expect("services present");
        let web = services["web"].as_ref().expect("web body");
        let ports = web.ports.as_ref().expect("ports present");
        assert!(matches!(ports[0], PortDoc::Number(8080)));
        assert!(matches!(ports[1], PortDoc::Shorthand(ref s) if s == "8443:443"));
    }

    #[test]
    fn build_bare_string_and_detailed() {
        let doc = parse(
            "services:\n  api:\n    build: ./api\n  web:\n    build:\n      context: ./web\n      dockerfile: Dockerfile.prod\n      args:\n        RELEASE: 1\n",
        );
        let services = doc.services.expect("services present");
        let api = services["api"].as_ref().expect("api body");
        assert!(matches!(api.build, Some(BuildDoc::Context(ref c)) if c == "./api"));
        let web = services["web"].as_ref().expect("web body");
        let Some(BuildDoc::Detailed(detail)) = &web.build else {
            panic!("expected detailed form");
        };
        assert_eq!(detail.context, "./web");
        assert_eq!(detail.dockerfile.as_deref(), Some("Dockerfile.prod"));
        assert_eq!(detail.args.len(), 1);
    }

    #[test]
    fn build_detailed_context_defaults_to_dot() {
        let doc = parse("services:\n  api:\n    build:\n      dockerfile: Dockerfile\n");
        let services = doc.services.expect("services present");
        let api = services["api"].as_ref().expect("api body");
        let Some(BuildDoc::Detailed(detail)) = &api.build else {
            panic!("expected detailed form");
        };
        assert_eq!(detail.context, ".");
    }

    #[test]
    fn depends_on_list_and_condition_map() {
        let doc = parse(
            "services:\n  web:\n    depends_on:\n      - api\n  worker:\n    depends_on:\n      db:\n        condition: service_healthy\n      cache:\n",
        );
        let services = doc.services.expect("services present");
        let web = services["web"].as_ref().expect("web body");
        assert!(matches!(web.depends_on, Some(DependsOnDoc::List(_))));
        let worker = services["worker"].as_ref().expect("worker body");
        let Some(DependsOnDoc::Conditioned(entries)) = &worker.depends_on else {
            panic!("expected map form");
        };
        assert_eq!(entries.len(), 2);
        assert!(entries["cache"].is_none());
    }

    #[test]
    fn null_section_bodies_are_tolerated() {
        let doc = parse("services:\nvolumes:\n  pgdata:\nnetworks:\n  backend:\n");
        assert!(doc.services.is_none());
        let volumes = doc.volumes.expect("volumes present");
        assert!(volumes["pgdata"].is_none());
    }

    #[test]
    fn version_key_is_accepted_in_both_spellings() {
        let quoted = parse("version: \"3.8\"\n");
        assert!(quoted.version.is_some());
        let bare = parse("version: 3.8\n");
        assert!(bare.version.is_some());
    }

    #[test]
    fn env_file_single_and_list() {
        let doc = parse(
            "services:\n  a:\n    env_file: .env\n  b:\n    env_file:\n      - .env\n      - .env.local\n",
        );
        let services = doc.services.expect("services present");
        let a = services["a"].as_ref().expect("a body");
        assert!(matches!(a.env_file, Some(StringOrList::One(_))));
        let b = services["b"].as_ref().expect("b body");
        let Some(StringOrList::Many(files)) = &b.env_file else {
            panic!("expected list form");
        };
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let result = serde_yaml::from_str::<ManifestDoc>("servcies:\n  web:\n    image: nginx\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_service_key_is_rejected() {
        let result =
            serde_yaml::from_str::<ManifestDoc>("services:\n  web:\n    imagee: nginx:1.27\n");
        assert!(result.is_err());
    }
}
