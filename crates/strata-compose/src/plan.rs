//! Canonical deployment plan emission.
//!
//! A [`Plan`] pairs the merged, validated manifest with its resolved
//! startup order and renders both as canonical YAML: name-keyed maps,
//! canonically sorted lists, normalized shorthand spellings. Equal inputs
//! produce byte-identical output, which makes the SHA-256 digest a usable
//! change detector for deployment tooling.

use serde::Serialize;
use sha2::{Digest, Sha256};

use strata_common::error::Result;

use crate::graph::DependencyGraph;
use crate::model::Manifest;

/// A fully resolved deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// The merged manifest, inlined at the top level of the document.
    #[serde(flatten)]
    manifest: Manifest,
    /// Dependency-respecting startup order, emitted as an extension field.
    #[serde(rename = "x-startup-order", skip_serializing_if = "Vec::is_empty")]
    startup_order: Vec<String>,
}

impl Plan {
    /// Assembles the plan for a validated manifest.
    ///
    /// # Errors
    ///
    /// Returns [`strata_common::error::StrataError::CyclicDependency`] if
    /// the dependency graph is cyclic; a validated manifest never is.
    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        let startup_order = DependencyGraph::from_manifest(&manifest).startup_order()?;
        Ok(Self {
            manifest,
            startup_order,
        })
    }

    /// Renders the plan as canonical YAML.
    ///
    /// # Errors
    ///
    /// Returns [`strata_common::error::StrataError::Serialization`] if
    /// YAML emission fails.
    pub fn render(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// SHA-256 digest of the rendered plan, as lowercase hex.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Plan::render`].
    pub fn digest(&self) -> Result<String> {
        let rendered = self.render()?;
        let digest = Sha256::digest(rendered.as_bytes());
        Ok(format!("{digest:x}"))
    }

    /// The manifest backing this plan.
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Services in the order they should be started.
    #[must_use]
    pub fn startup_order(&self) -> &[String] {
        &self.startup_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::{loader, merge};

    fn plan_of(sources: &[&str]) -> Plan {
        let fragments = sources
            .iter()
            .map(|s| loader::load_str(s, Path::new("test.yaml")).expect("should load"))
            .collect();
        let manifest = merge::merge(fragments).expect("should merge");
        Plan::from_manifest(manifest).expect("should plan")
    }

    const STACK: &str = "\
services:
  api:
    image: api:1.0
    ports:
      - \"8080:80/tcp\"
    depends_on: [db]
  db:
    image: postgres:16
    volumes:
      - pgdata:/var/lib/postgresql/data
volumes:
  pgdata:
";

    #[test]
    fn identical_inputs_render_byte_identically() {
        let first = plan_of(&[STACK]).render().expect("should render");
        let second = plan_of(&[STACK]).render().expect("should render");
        assert_eq!(first, second);
    }

    #[test]
    fn sections_appear_in_canonical_order() {
        let rendered = plan_of(&[STACK]).render().expect("should render");
        // Anchor on column-zero keys; service bodies repeat some names.
        assert!(rendered.starts_with("services:"), "got: {rendered}");
        let networks = rendered.find("\nnetworks:").expect("networks section");
        let volumes = rendered.find("\nvolumes:").expect("volumes section");
        let order = rendered.find("\nx-startup-order:").expect("order section");
        assert!(networks < volumes && volumes < order);
    }

    #[test]
    fn shorthands_are_emitted_normalized() {
        let rendered = plan_of(&[STACK]).render().expect("should render");
        // The redundant /tcp suffix is dropped on emission.
        assert!(rendered.contains("8080:80"), "got: {rendered}");
        assert!(!rendered.contains("8080:80/tcp"), "got: {rendered}");
        assert!(
            rendered.contains("pgdata:/var/lib/postgresql/data"),
            "got: {rendered}"
        );
    }

    #[test]
    fn startup_order_lists_dependencies_first() {
        let plan = plan_of(&[STACK]);
        assert_eq!(plan.startup_order(), ["db", "api"]);
        let rendered = plan.render().expect("should render");
        assert!(rendered.contains("x-startup-order:"), "got: {rendered}");
    }

    #[test]
    fn digest_is_stable_hex() {
        let first = plan_of(&[STACK]).digest().expect("should digest");
        let second = plan_of(&[STACK]).digest().expect("should digest");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_tracks_content_changes() {
        let base = plan_of(&[STACK]).digest().expect("should digest");
        let overlaid = plan_of(&[STACK, "services:\n  api:\n    image: api:2.0\n"])
            .digest()
            .expect("should digest");
        assert_ne!(base, overlaid);
    }

    #[test]
    fn overlay_spread_does_not_change_the_plan() {
        let whole = plan_of(&[STACK]).render().expect("should render");
        let split = plan_of(&[
            "services:\n  api:\n    image: api:0.9\n    depends_on: [db]\n  db:\n    image: postgres:16\n    volumes:\n      - pgdata:/var/lib/postgresql/data\nvolumes:\n  pgdata:\n",
            "services:\n  api:\n    image: api:1.0\n    ports:\n      - \"8080:80\"\n",
        ])
        .render()
        .expect("should render");
        assert_eq!(whole, split);
    }
}
