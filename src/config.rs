//! Configuration for xray-traces.
//!
//! Settings are layered, lowest precedence first:
//! - Default values
//! - TOML configuration file (`.xray-traces/settings.toml` or `--config`)
//! - Environment variables
//! - CLI arguments (applied by the caller)
//!
//! # Config environments
//!
//! Top-level tables in the file are environments. `default` always applies,
//! and the environment chosen with `--config-env` is layered on top:
//!
//! ```toml
//! [default.aws]
//! region = "us-east-1"
//!
//! [prod.aws]
//! region = "eu-west-1"
//! profile = "prod"
//! ```
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `XRAY_TRACES_` and use double
//! underscores to separate nested levels. They override every environment:
//! - `XRAY_TRACES_AWS__REGION=eu-central-1` sets `aws.region`
//! - `XRAY_TRACES_PULLER__POLL_INTERVAL_SECS=5` sets `puller.poll_interval_secs`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".xray-traces";
/// Environment used when `--config-env` is not given.
pub const DEFAULT_CONFIG_ENV: &str = "default";

const ENV_PREFIX: &str = "XRAY_TRACES_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// AWS connection settings
    #[serde(default)]
    pub aws: AwsConfig,

    /// Puller tuning
    #[serde(default)]
    pub puller: PullerConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// Region for X-Ray requests; the SDK's provider chain is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Named profile from ~/.aws/config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PullerConfig {
    /// Seconds between polls while tailing
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Polls without new data before tailing stops
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Trace ids per BatchGetTraces request (X-Ray allows at most 5)
    #[serde(default = "default_max_trace_ids")]
    pub max_trace_ids: usize,

    /// Minutes to look back when no start time is given
    #[serde(default = "default_window_mins")]
    pub default_window_mins: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `puller = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_poll_interval_secs() -> u64 {
    1
}
fn default_max_retries() -> u32 {
    1000
}
fn default_max_trace_ids() -> usize {
    5
}
fn default_window_mins() -> i64 {
    10
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            aws: AwsConfig::default(),
            puller: PullerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PullerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_retries: default_max_retries(),
            max_trace_ids: default_max_trace_ids(),
            default_window_mins: default_window_mins(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from the workspace settings file, if any.
    pub fn load(config_env: &str) -> Result<Self, Box<figment::Error>> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| Self::default_config_path());
        Self::load_from(config_path, config_env)
    }

    /// Load configuration from a specific file.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(
        path: impl AsRef<Path>,
        config_env: &str,
    ) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()).nested())
            // Double underscore separates nested levels, single underscore stays
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into())
                    .global(),
            )
            .select(config_env)
            .extract()
            .map_err(Box::new)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join("settings.toml")
    }

    /// Find the settings file by looking for `.xray-traces` from the current
    /// directory up to the root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Render as a settings file with every value under `[default.*]`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let document = BTreeMap::from([(DEFAULT_CONFIG_ENV, self)]);
        toml::to_string_pretty(&document)
    }

    /// Save under the `default` environment.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;

        Ok(())
    }

    /// Create a default settings file in the current directory.
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = Self::default_config_path();

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
