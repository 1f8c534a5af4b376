//! Application and startup configuration for Igniter.
//!
//! User config lives at `~/.igniter/igniter.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IgniterError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "igniter.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".igniter";

/// Credentials store location relative to the home directory.
const CREDENTIALS_RELATIVE_PATH: [&str; 2] = [".aws", "credentials"];

/// Profile holding the product-advertising API keys.
pub const DEFAULT_PROFILE: &str = "paapi";

/// Known-publishers file name, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = "known_publishers";

// ---------------------------------------------------------------------------
// Config structs (matching igniter.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Credentials store lookup.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Worker process to launch.
    #[serde(default)]
    pub worker: WorkerProcessConfig,

    /// Run-time behavior of the host.
    #[serde(default)]
    pub run: RunConfig,
}

/// `[credentials]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Profile section to read from `~/.aws/credentials`.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Associate tag used when the profile does not carry `associate_tag`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associate_tag: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            associate_tag: None,
        }
    }
}

fn default_profile() -> String {
    DEFAULT_PROFILE.into()
}

/// `[worker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProcessConfig {
    /// Executable that hosts the worker (e.g. `node`).
    #[serde(default = "default_worker_command")]
    pub command: String,

    /// Arguments placed before the passthrough argv (e.g. the script path).
    #[serde(default = "default_worker_args")]
    pub args: Vec<String>,
}

impl Default for WorkerProcessConfig {
    fn default() -> Self {
        Self {
            command: default_worker_command(),
            args: default_worker_args(),
        }
    }
}

fn default_worker_command() -> String {
    "node".into()
}
fn default_worker_args() -> Vec<String> {
    vec!["dist/worker.js".into()]
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory that relative `writeFile` names resolve against.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Known-publishers file.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// How long to wait for the worker after forwarding an interrupt.
    #[serde(default = "default_interrupt_grace_ms")]
    pub interrupt_grace_ms: u64,

    /// Idle deadline between inbound events. Unset waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            state_file: default_state_file(),
            interrupt_grace_ms: default_interrupt_grace_ms(),
            response_timeout_secs: None,
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_state_file() -> String {
    DEFAULT_STATE_FILE.into()
}
fn default_interrupt_grace_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Host config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime host configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory that relative `writeFile` names resolve against.
    pub output_dir: PathBuf,
    /// Grace period after an interrupt before the host gives up waiting.
    pub interrupt_grace: Duration,
    /// Idle deadline between inbound events.
    pub response_timeout: Option<Duration>,
}

impl From<&AppConfig> for HostConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.run.output_dir),
            interrupt_grace: Duration::from_millis(config.run.interrupt_grace_ms),
            response_timeout: config.run.response_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Startup config
// ---------------------------------------------------------------------------

/// Explicit startup inputs: where the credentials and state live and what
/// arguments to pass through. Built once by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    pub home_dir: PathBuf,
    pub credentials_path: PathBuf,
    pub state_path: PathBuf,
    pub argv: Vec<String>,
}

impl StartupConfig {
    /// Build from an explicit home directory; the credentials path is derived.
    pub fn new(home_dir: impl Into<PathBuf>, state_path: impl Into<PathBuf>, argv: Vec<String>) -> Self {
        let home_dir = home_dir.into();
        let credentials_path = CREDENTIALS_RELATIVE_PATH
            .iter()
            .fold(home_dir.clone(), |p, part| p.join(part));
        Self {
            home_dir,
            credentials_path,
            state_path: state_path.into(),
            argv,
        }
    }

    /// Build from the `HOME` environment variable.
    pub fn from_env(state_path: impl Into<PathBuf>, argv: Vec<String>) -> Result<Self> {
        let home = std::env::var("HOME").ok();
        Self::from_home(home.as_deref(), state_path, argv)
    }

    /// Build from an optional home value; unset or empty is fatal.
    pub fn from_home(
        home: Option<&str>,
        state_path: impl Into<PathBuf>,
        argv: Vec<String>,
    ) -> Result<Self> {
        match home {
            Some(h) if !h.trim().is_empty() => Ok(Self::new(h, state_path, argv)),
            _ => Err(IgniterError::config(
                "HOME is not set; cannot locate ~/.aws/credentials",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.igniter/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IgniterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.igniter/igniter.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        IgniterError::config(format!("failed to read {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| IgniterError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IgniterError::persistence(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IgniterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IgniterError::persistence(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
