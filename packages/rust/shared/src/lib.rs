//! Shared types, error model, and configuration for Igniter.
//!
//! This crate is the foundation depended on by all other Igniter crates.
//! It provides:
//! - [`IgniterError`]: the unified error type
//! - Domain types ([`Credentials`], [`WorkerConfig`], [`KnownPublishers`], [`FileWriteRequest`])
//! - Configuration ([`AppConfig`], [`HostConfig`], [`StartupConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CredentialsConfig, DEFAULT_PROFILE, DEFAULT_STATE_FILE, HostConfig, RunConfig,
    StartupConfig, WorkerProcessConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{IgniterError, Result};
pub use types::{Credentials, FileWriteRequest, KnownPublishers, RunId, WorkerConfig};
