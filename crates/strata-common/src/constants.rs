//! Workspace-wide constants and default file names.

/// Application name used in CLI output.
pub const APP_NAME: &str = "strata";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "strata";

/// Manifest file names probed, in order, when no `--file` is given.
pub const DEFAULT_MANIFEST_FILES: &[&str] =
    &["compose.yaml", "compose.yml", "docker-compose.yml"];

/// Name of the implicit network joined by services that declare none.
pub const DEFAULT_NETWORK: &str = "default";

/// Driver assumed for networks that do not name one.
pub const DEFAULT_NETWORK_DRIVER: &str = "bridge";

/// Permission bits that grant group or world read access to a secret file.
pub const SECRET_BROAD_ACCESS_MASK: u32 = 0o044;
