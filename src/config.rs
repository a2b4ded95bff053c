//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.factlens.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analysis backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Record store (Supabase) settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Polling settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// Report output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Analysis backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// URL of the analyze endpoint.
    #[serde(default = "default_analyze_url")]
    pub analyze_url: String,

    /// Request timeout in seconds for the submission POST.
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            analyze_url: default_analyze_url(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_analyze_url() -> String {
    // Local dev default; override via FACTLENS_BACKEND_URL or config.
    "http://localhost:8000/analyze".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Supabase project URL (e.g. https://xyz.supabase.co).
    #[serde(default)]
    pub supabase_url: String,

    /// Supabase anon key.
    #[serde(default)]
    pub supabase_key: String,

    /// Table holding the analysis records.
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            table: default_table(),
        }
    }
}

fn default_table() -> String {
    "video_analysis".to_string()
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between record-store queries.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Maximum number of queries before giving up quietly.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_interval() -> u64 {
    2
}

fn default_max_attempts() -> u32 {
    300 // with 2s spacing, a 10-minute ceiling
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default report file path.
    #[serde(default = "default_output")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output(),
        }
    }
}

fn default_output() -> String {
    "factlens_report.md".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".factlens.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their env fallbacks) take precedence over
    /// config file settings; they only override when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref backend_url) = args.backend_url {
            self.backend.analyze_url = backend_url.clone();
        }
        if let Some(ref supabase_url) = args.supabase_url {
            self.store.supabase_url = supabase_url.clone();
        }
        if let Some(ref supabase_key) = args.supabase_key {
            self.store.supabase_key = supabase_key.clone();
        }
        if let Some(ref table) = args.table {
            self.store.table = table.clone();
        }
        if let Some(interval) = args.poll_interval {
            self.poll.interval_secs = interval;
        }
        if let Some(attempts) = args.max_attempts {
            self.poll.max_attempts = attempts;
        }
        if let Some(ref output) = args.output {
            self.output.path = output.display().to_string();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
