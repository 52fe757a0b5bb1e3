//! # strata-compose
//!
//! Loader, merger, and validator for layered compose-dialect manifests.
//!
//! Handles:
//! - **Model**: Typed representation of services, networks, secrets, volumes.
//! - **Loader**: Strict document parsing and shorthand-string grammars.
//! - **Merge**: Ordered overlay folding with defined per-field rules.
//! - **Secrets**: File-backed secret resolution checks.
//! - **Graph**: Dependency reachability and cycle detection.
//! - **Plan**: Canonical, deterministic plan emission.
//! - **Pipeline**: The load-merge-resolve-validate-emit facade.

pub mod graph;
pub mod loader;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod secrets;
pub mod validate;
