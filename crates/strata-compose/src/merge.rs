//! Ordered merging of manifest fragments.
//!
//! Fragments are folded left to right: later files win scalar fields,
//! extend sets and maps, and replace keyed collection entries. The fold is
//! followed by canonicalization, so the merged manifest is identical for
//! identical inputs regardless of how declarations were spread across
//! files.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use strata_common::constants::{DEFAULT_NETWORK, DEFAULT_NETWORK_DRIVER};
use strata_common::error::{Result, StrataError};

use crate::model::{Manifest, Mount, Network, PortBinding, Protocol, Service, Volume};

/// Merges manifest fragments in declaration order and canonicalizes the
/// result.
///
/// Services that end up naming no networks join the implicit default
/// network, which is materialized with the default driver when needed.
///
/// # Errors
///
/// Returns [`StrataError::PortConflict`] when two distinct services publish
/// the same host port for the same protocol.
pub fn merge(fragments: Vec<Manifest>) -> Result<Manifest> {
    tracing::debug!(fragments = fragments.len(), "merging manifest fragments");
    let mut merged = Manifest::default();
    for fragment in fragments {
        merge_into(&mut merged, fragment);
    }
    attach_default_network(&mut merged);
    canonicalize(&mut merged);
    check_port_conflicts(&merged)?;
    Ok(merged)
}

fn merge_into(base: &mut Manifest, overlay: Manifest) {
    for (name, service) in overlay.services {
        match base.services.entry(name) {
            Entry::Occupied(mut existing) => merge_service(existing.get_mut(), service),
            Entry::Vacant(slot) => {
                let _ = slot.insert(service);
            }
        }
    }
    for (name, network) in overlay.networks {
        match base.networks.entry(name) {
            Entry::Occupied(mut existing) => merge_network(existing.get_mut(), network),
            Entry::Vacant(slot) => {
                let _ = slot.insert(network);
            }
        }
    }
    // A secret has a single required field, so redefinition replaces it.
    for (name, secret) in overlay.secrets {
        let _ = base.secrets.insert(name, secret);
    }
    for (name, volume) in overlay.volumes {
        match base.volumes.entry(name) {
            Entry::Occupied(mut existing) => merge_volume(existing.get_mut(), volume),
            Entry::Vacant(slot) => {
                let _ = slot.insert(volume);
            }
        }
    }
}

fn merge_service(base: &mut Service, overlay: Service) {
    if overlay.image.is_some() {
        base.image = overlay.image;
    }
    if overlay.build.is_some() {
        base.build = overlay.build;
    }
    if overlay.command.is_some() {
        base.command = overlay.command;
    }
    if overlay.restart.is_some() {
        base.restart = overlay.restart;
    }
    base.environment.extend(overlay.environment);
    for file in overlay.env_file {
        if !base.env_file.contains(&file) {
            base.env_file.push(file);
        }
    }
    merge_ports(&mut base.ports, overlay.ports);
    merge_mounts(&mut base.volumes, overlay.volumes);
    base.networks.extend(overlay.networks);
    base.secrets.extend(overlay.secrets);
    base.depends_on.extend(overlay.depends_on);
}

/// A later binding replaces an earlier one occupying the same slot:
/// published ports share a slot per host port and protocol, container-only
/// ports per container port and protocol.
fn merge_ports(base: &mut Vec<PortBinding>, overlay: Vec<PortBinding>) {
    for binding in overlay {
        let slot = base
            .iter_mut()
            .find(|existing| same_binding_slot(existing, &binding));
        match slot {
            Some(existing) => *existing = binding,
            None => base.push(binding),
        }
    }
}

fn same_binding_slot(a: &PortBinding, b: &PortBinding) -> bool {
    if a.protocol != b.protocol {
        return false;
    }
    match (a.host, b.host) {
        (Some(left), Some(right)) => left == right,
        (None, None) => a.container == b.container,
        _ => false,
    }
}

/// A later mount replaces an earlier one with the same container target.
fn merge_mounts(base: &mut Vec<Mount>, overlay: Vec<Mount>) {
    for mount in overlay {
        let slot = base
            .iter_mut()
            .find(|existing| existing.target == mount.target);
        match slot {
            Some(existing) => *existing = mount,
            None => base.push(mount),
        }
    }
}

fn merge_network(base: &mut Network, overlay: Network) {
    if overlay.driver.is_some() {
        base.driver = overlay.driver;
    }
    if overlay.external.is_some() {
        base.external = overlay.external;
    }
}

fn merge_volume(base: &mut Volume, overlay: Volume) {
    if overlay.driver.is_some() {
        base.driver = overlay.driver;
    }
}

/// Services that name no networks join the implicit default network.
///
/// The network itself is materialized only when some service ends up on
/// it, so fully wired manifests never grow a stray definition.
fn attach_default_network(manifest: &mut Manifest) {
    let mut needs_default = false;
    for service in manifest.services.values_mut() {
        if service.networks.is_empty() {
            let _ = service.networks.insert(DEFAULT_NETWORK.to_string());
            needs_default = true;
        }
    }
    if needs_default && !manifest.networks.contains_key(DEFAULT_NETWORK) {
        let _ = manifest.networks.insert(
            DEFAULT_NETWORK.to_string(),
            Network {
                driver: Some(DEFAULT_NETWORK_DRIVER.to_string()),
                external: None,
            },
        );
    }
}

/// Sorts positional collections so equal inputs emit byte-identical plans.
///
/// `env_file` keeps declaration order since application order is
/// significant.
fn canonicalize(manifest: &mut Manifest) {
    for service in manifest.services.values_mut() {
        service
            .ports
            .sort_by_key(|binding| {
                (
                    binding.host.is_none(),
                    binding.host,
                    binding.container,
                    binding.protocol,
                )
            });
        service.volumes.sort_by(|a, b| a.target.cmp(&b.target));
    }
}

/// Rejects manifests where two services publish the same host port.
///
/// TCP and UDP publications are independent namespaces. The host interface
/// is deliberately not part of the key: two services binding the same port
/// on different interfaces still contend for it in common single-host use.
fn check_port_conflicts(manifest: &Manifest) -> Result<()> {
    let mut published: BTreeMap<(u16, Protocol), &str> = BTreeMap::new();
    for (name, service) in &manifest.services {
        for binding in &service.ports {
            let Some(host) = binding.host else { continue };
            match published.entry((host, binding.protocol)) {
                Entry::Vacant(slot) => {
                    let _ = slot.insert(name);
                }
                Entry::Occupied(existing) => {
                    return Err(StrataError::PortConflict {
                        port: host,
                        first: (*existing.get()).to_string(),
                        second: name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::loader;

    fn fragment(source: &str) -> Manifest {
        loader::load_str(source, Path::new("test.yaml")).expect("should load")
    }

    fn merge_sources(sources: &[&str]) -> Result<Manifest> {
        merge(sources.iter().map(|s| fragment(s)).collect())
    }

    #[test]
    fn later_fragment_wins_scalar_fields() {
        let merged = merge_sources(&[
            "services:\n  api:\n    image: api:1.0\n    restart: always\n",
            "services:\n  api:\n    image: api:2.0\n",
        ])
        .expect("should merge");
        let api = &merged.services["api"];
        assert_eq!(api.image.as_deref(), Some("api:2.0"));
        assert_eq!(api.restart.map(|r| r.to_string()), Some("always".into()));
    }

    #[test]
    fn environment_unions_with_overlay_winning_shared_keys() {
        let merged = merge_sources(&[
            "services:\n  api:\n    environment:\n      LOG_LEVEL: info\n      WORKERS: 2\n",
            "services:\n  api:\n    environment:\n      LOG_LEVEL: debug\n      CACHE: redis\n",
        ])
        .expect("should merge");
        let env = &merged.services["api"].environment;
        assert_eq!(env["LOG_LEVEL"], "debug");
        assert_eq!(env["WORKERS"], "2");
        assert_eq!(env["CACHE"], "redis");
    }

    #[test]
    fn networks_and_depends_on_union() {
        let merged = merge_sources(&[
            "services:\n  api:\n    networks: [internal]\n    depends_on: [db]\n",
            "services:\n  api:\n    networks: [edge]\n    depends_on: [cache]\n",
        ])
        .expect("should merge");
        let api = &merged.services["api"];
        assert!(api.networks.contains("internal") && api.networks.contains("edge"));
        assert!(api.depends_on.contains("db") && api.depends_on.contains("cache"));
    }

    #[test]
    fn overlay_replaces_same_host_port_slot() {
        let merged = merge_sources(&[
            "services:\n  web:\n    ports: [\"8080:80\"]\n",
            "services:\n  web:\n    ports: [\"8080:8000\", \"8443:443\"]\n",
        ])
        .expect("should merge");
        let ports = &merged.services["web"].ports;
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].host, Some(8080));
        assert_eq!(ports[0].container, 8000);
        assert_eq!(ports[1].host, Some(8443));
    }

    #[test]
    fn overlay_replaces_same_mount_target() {
        let merged = merge_sources(&[
            "services:\n  db:\n    volumes: [\"pgdata:/var/lib/postgresql/data\"]\n",
            "services:\n  db:\n    volumes: [\"pgdata-prod:/var/lib/postgresql/data\"]\n",
        ])
        .expect("should merge");
        let mounts = &merged.services["db"].volumes;
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].to_string(), "pgdata-prod:/var/lib/postgresql/data");
    }

    #[test]
    fn env_file_appends_without_duplicates() {
        let merged = merge_sources(&[
            "services:\n  api:\n    env_file: [.env, .env.base]\n",
            "services:\n  api:\n    env_file: [.env, .env.prod]\n",
        ])
        .expect("should merge");
        let files: Vec<_> = merged.services["api"]
            .env_file
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        assert_eq!(files, [".env", ".env.base", ".env.prod"]);
    }

    #[test]
    fn default_network_attaches_only_where_needed() {
        let merged = merge_sources(&[
            "services:\n  api:\n    image: api:1\n    networks: [internal]\n  worker:\n    image: worker:1\nnetworks:\n  internal: {}\n",
        ])
        .expect("should merge");
        assert!(!merged.services["api"].networks.contains(DEFAULT_NETWORK));
        assert!(merged.services["worker"].networks.contains(DEFAULT_NETWORK));
        let default = &merged.networks[DEFAULT_NETWORK];
        assert_eq!(default.driver.as_deref(), Some(DEFAULT_NETWORK_DRIVER));
    }

    #[test]
    fn default_network_not_materialized_when_unused() {
        let merged = merge_sources(&[
            "services:\n  api:\n    image: api:1\n    networks: [internal]\nnetworks:\n  internal: {}\n",
        ])
        .expect("should merge");
        assert!(!merged.networks.contains_key(DEFAULT_NETWORK));
    }

    #[test]
    fn network_fields_merge_key_wise() {
        let merged = merge_sources(&[
            "networks:\n  edge:\n    driver: bridge\n",
            "networks:\n  edge:\n    external: true\n",
        ])
        .expect("should merge");
        let edge = &merged.networks["edge"];
        assert_eq!(edge.driver.as_deref(), Some("bridge"));
        assert_eq!(edge.external, Some(true));
    }

    #[test]
    fn secret_redefinition_replaces_backing_file() {
        let merged = merge_sources(&[
            "secrets:\n  db_password:\n    file: ./dev/password.txt\n",
            "secrets:\n  db_password:\n    file: ./prod/password.txt\n",
        ])
        .expect("should merge");
        assert_eq!(
            merged.secrets["db_password"].file,
            Path::new("./prod/password.txt")
        );
    }

    #[test]
    fn conflicting_host_ports_name_both_services() {
        let err = merge_sources(&[
            "services:\n  grafana:\n    ports: [\"3000:3000\"]\n  web:\n    ports: [\"3000:8080\"]\n",
        ])
        .expect_err("should conflict");
        assert!(
            matches!(
                err,
                StrataError::PortConflict { port: 3000, ref first, ref second }
                    if first == "grafana" && second == "web"
            ),
            "got: {err}"
        );
    }

    #[test]
    fn same_port_different_protocols_do_not_conflict() {
        let merged = merge_sources(&[
            "services:\n  dns:\n    ports: [\"53:53/udp\"]\n  dns-tcp:\n    ports: [\"53:53/tcp\"]\n",
        ])
        .expect("should merge");
        assert_eq!(merged.services.len(), 2);
    }

    #[test]
    fn overlay_refining_own_port_is_not_a_conflict() {
        let merged = merge_sources(&[
            "services:\n  web:\n    ports: [\"8080:80\"]\n",
            "services:\n  web:\n    ports: [\"127.0.0.1:8080:80\"]\n",
        ])
        .expect("should merge");
        let ports = &merged.services["web"].ports;
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].to_string(), "127.0.0.1:8080:80");
    }

    #[test]
    fn ports_are_canonically_ordered() {
        let merged = merge_sources(&[
            "services:\n  app:\n    ports: [9100, \"8443:443\", \"8080:80\", 5432]\n",
        ])
        .expect("should merge");
        let rendered: Vec<_> = merged.services["app"]
            .ports
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, ["8080:80", "8443:443", "5432", "9100"]);
    }

    #[test]
    fn no_fragments_yield_empty_manifest() {
        let merged = merge(Vec::new()).expect("should merge");
        assert_eq!(merged, Manifest::default());
    }
}
