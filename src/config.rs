//! Configuration system for rm-guard.
//!
//! Supports layered configuration:
//! 1. Environment variables (`RM_GUARD_*`, highest priority)
//! 2. Project config (`.rm-guard.toml`, nearest ancestor of the working dir)
//! 3. User config (`~/.config/rm-guard/config.toml`)
//! 4. Compiled defaults (lowest priority)
//!
//! Invalid or unreadable config files are ignored rather than propagated:
//! the hook must keep working with defaults no matter what is on disk.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Project-level config file name.
const PROJECT_CONFIG_NAME: &str = ".rm-guard.toml";

/// User config file name under the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable that disables the hook entirely.
const ENV_BYPASS: &str = "RM_GUARD_BYPASS";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,

    /// Alias resolver settings.
    pub alias: AliasConfig,

    /// Forbidden-pattern settings.
    pub patterns: PatternsConfig,
}

/// General configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Color output mode: "auto", "always", "never".
    pub color: String,

    /// Path to the decision log file (optional). Supports `~` expansion.
    pub log_file: Option<String>,

    /// Decision log format.
    pub log_format: LogFormat,

    /// Whether to show verbose output in CLI mode.
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: "auto".to_string(),
            log_file: None,
            log_format: LogFormat::Text,
            verbose: false,
        }
    }
}

/// Decision log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Alias resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    /// Whether alias resolution runs at all.
    pub enabled: bool,

    /// Shell to source for alias definitions. Defaults to `$SHELL`, then
    /// `/bin/bash`.
    pub shell: Option<String>,

    /// Timeout for the one-time alias-listing subprocess, in milliseconds.
    pub timeout_ms: u64,

    /// Leading tokens that are never treated as aliases. These are
    /// well-known commands whose meaning is already unambiguous.
    pub skip_commands: Vec<String>,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shell: None,
            timeout_ms: 5000,
            skip_commands: ["git", "rm", "cat", "less", "nano", "vim"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Forbidden-pattern configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    /// Extra binaries to block in addition to the built-in `rm` pattern.
    pub block: Vec<BlockedBinary>,
}

/// An extra blocked binary: a bare name, or a name with a custom reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockedBinary {
    /// Simple binary name; a generic reason is generated.
    Simple(String),
    /// Binary name with remediation guidance.
    Detailed {
        name: String,
        /// Reason shown when this binary blocks a command.
        reason: Option<String>,
    },
}

impl Config {
    /// Load configuration from the highest-priority available source.
    ///
    /// The nearest project `.rm-guard.toml` wins over the user config;
    /// environment variables are applied on top of whichever file loaded.
    #[must_use]
    pub fn load() -> Self {
        let mut config = find_project_config()
            .or_else(Self::user_config_path)
            .and_then(|path| Self::load_from_file(&path))
            .unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration from a specific file. Returns `None` when the file
    /// is missing or not valid TOML.
    #[must_use]
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    /// Check whether the bypass escape hatch is active.
    #[must_use]
    pub fn is_bypassed() -> bool {
        matches!(
            env::var(ENV_BYPASS).ok().as_deref(),
            Some("1" | "true" | "yes")
        )
    }

    /// Path of the user config file (`~/.config/rm-guard/config.toml`).
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rm-guard").join(CONFIG_FILE_NAME))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(log_file) = env::var("RM_GUARD_LOG_FILE") {
            if log_file.is_empty() {
                self.general.log_file = None;
            } else {
                self.general.log_file = Some(log_file);
            }
        }
        if let Ok(shell) = env::var("RM_GUARD_SHELL") {
            if !shell.is_empty() {
                self.alias.shell = Some(shell);
            }
        }
        if let Ok(timeout) = env::var("RM_GUARD_ALIAS_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.alias.timeout_ms = ms;
            }
        }
        if matches!(
            env::var("RM_GUARD_ALIAS_DISABLED").ok().as_deref(),
            Some("1" | "true" | "yes")
        ) {
            self.alias.enabled = false;
        }
    }

    /// Generate a commented sample configuration.
    #[must_use]
    pub fn generate_sample() -> String {
        concat!(
            "# rm-guard configuration\n",
            "# Project file: .rm-guard.toml (repo root)\n",
            "# User file:    ~/.config/rm-guard/config.toml\n",
            "\n",
            "[general]\n",
            "# Color output: \"auto\", \"always\", \"never\"\n",
            "color = \"auto\"\n",
            "# Log blocked decisions to a file (uncomment to enable)\n",
            "# log_file = \"~/.local/share/rm-guard/blocked.log\"\n",
            "# log_format = \"text\"  # or \"json\"\n",
            "\n",
            "[alias]\n",
            "# Source the user's shell startup file to expand aliases\n",
            "enabled = true\n",
            "# shell = \"/bin/zsh\"\n",
            "timeout_ms = 5000\n",
            "# Leading tokens never treated as aliases\n",
            "skip_commands = [\"git\", \"rm\", \"cat\", \"less\", \"nano\", \"vim\"]\n",
            "\n",
            "[patterns]\n",
            "# Extra binaries to block besides rm:\n",
            "# block = [\"shred\", { name = \"dd\", reason = \"dd overwrites devices\" }]\n",
            "block = []\n",
        )
        .to_string()
    }
}

/// Walk up from the working directory looking for a project config file.
fn find_project_config() -> Option<PathBuf> {
    let mut dir = env::current_dir().ok()?;
    loop {
        let candidate = dir.join(PROJECT_CONFIG_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.general.color, "auto");
        assert!(config.general.log_file.is_none());
        assert!(config.alias.enabled);
        assert_eq!(config.alias.timeout_ms, 5000);
        assert!(config.alias.skip_commands.iter().any(|c| c == "git"));
        assert!(config.patterns.block.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[general]\nverbose = true\n\n[alias]\ntimeout_ms = 250\n\n[patterns]\nblock = [\"shred\"]\n"
        )
        .expect("write config");

        let config = Config::load_from_file(file.path()).expect("config parses");
        assert!(config.general.verbose);
        assert_eq!(config.alias.timeout_ms, 250);
        assert_eq!(config.patterns.block.len(), 1);
        // Unspecified sections keep their defaults.
        assert_eq!(config.general.color, "auto");
        assert!(config.alias.enabled);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "this is not toml [[[").expect("write garbage");
        assert!(Config::load_from_file(file.path()).is_none());
    }

    #[test]
    fn test_blocked_binary_forms() {
        let config: Config = toml::from_str(
            "[patterns]\nblock = [\"shred\", { name = \"dd\", reason = \"overwrites devices\" }]\n",
        )
        .expect("config parses");

        assert_eq!(config.patterns.block.len(), 2);
        assert!(matches!(
            &config.patterns.block[0],
            BlockedBinary::Simple(name) if name == "shred"
        ));
        assert!(matches!(
            &config.patterns.block[1],
            BlockedBinary::Detailed { name, reason: Some(reason) }
                if name == "dd" && reason == "overwrites devices"
        ));
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = Config::generate_sample();
        let parsed: Result<Config, _> = toml::from_str(&sample);
        assert!(parsed.is_ok(), "sample config must parse: {parsed:?}");
    }
}
