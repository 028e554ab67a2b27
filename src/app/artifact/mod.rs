//! Artifact lifecycle
//!
//! # Module Organization
//!
//! - [`config`] - Download directory and retention windows
//! - [`path`] - Artifact and attachment naming
//! - [`manager`] - Creation, lookup and deletion of artifacts
//! - [`reaper`] - Periodic background cleanup

pub mod config;
pub mod manager;
pub mod path;
pub mod reaper;

pub use config::ArtifactConfig;
pub use manager::{ArtifactManager, CleanupReport};
pub use path::{artifact_path, download_name, session_id_from_path};
pub use reaper::ArtifactReaper;
