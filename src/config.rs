//! Configuration Module - User preferences from config.toml
//!
//! Supports:
//! - Log level
//! - Engine binaries and the VCS hotspot window
//! - Default values for every `grep`/`scan` flag
//!
//! Flags given on the command line always win; compiled plans carry every
//! value themselves and never consult `[defaults]`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{CaseMode, MatchMode, Strategy};
use crate::report::OutputFormat;

/// grape configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// External engine settings
    pub engine: EngineConfig,
    /// Flag defaults
    pub defaults: DefaultsConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    /// Emit logs as JSON lines (still on stderr)
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

/// External binaries and VCS window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Search engine binary (ripgrep)
    pub binary: String,
    /// git binary used for the VCS marker and hotspots
    pub git_binary: String,
    /// Commits inspected for recent-change hotspots
    pub hotspot_commits: usize,
    /// Cap on paths read from those commits
    pub hotspot_max_paths: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "rg".to_string(),
            git_binary: "git".to_string(),
            hotspot_commits: 30,
            hotspot_max_paths: 2000,
        }
    }
}

/// Defaults for command-line flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub mode: MatchMode,
    pub case: CaseMode,
    pub format: OutputFormat,
    pub context: u32,
    /// Emitted hit cap (negative = unbounded)
    pub max_lines: i64,
    pub strategy: Strategy,
    pub max_probes: usize,
    /// Cascade derived-term cap (negative = unbounded)
    pub max_derived: i64,
    /// Snapshot file cap (negative = unbounded)
    pub snapshot_max_files: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Fixed,
            case: CaseMode::Smart,
            format: OutputFormat::Auto,
            context: 0,
            max_lines: 500,
            strategy: Strategy::Single,
            max_probes: 8,
            max_derived: 12,
            snapshot_max_files: 20000,
        }
    }
}

impl Config {
    /// Load config from default path or return defaults
    pub fn load() -> Self {
        Self::load_from(&Self::default_path()).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "grape", "grape")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".grape")
                    .join("config.toml")
            })
    }
}

/// Generate a sample config file with comments
pub fn generate_sample_config() -> String {
    r#"# grape configuration
# Location: ~/.config/grape/config.toml (or ~/.grape/config.toml)

[general]
# Log level: trace, debug, info, warn, error (logs always go to stderr)
log_level = "warn"

# Emit logs as JSON lines
json_logs = false

[engine]
# Search engine binary
binary = "rg"

# git binary for the snapshot marker and recent-change hotspots
git_binary = "git"

# Commits inspected for hotspots, and the cap on paths read from them
hotspot_commits = 30
hotspot_max_paths = 2000

[defaults]
# Match mode: "fixed" or "regex"
mode = "fixed"

# Case: "sensitive", "insensitive" or "smart"
case = "smart"

# Output: "auto" (human on a terminal, jsonl otherwise), "human", "jsonl"
format = "auto"

# Context lines around each hit (0-10)
context = 0

# Cap on emitted hit records (negative = unbounded)
max_lines = 500

# Strategy: "single", "parallel" or "cascade"
strategy = "single"

# Parallel probe cap
max_probes = 8

# Cascade derived-term cap (negative = unbounded)
max_derived = 12

# Surface snapshot file cap (negative = unbounded)
snapshot_max_files = 20000
"#
    .to_string()
}
