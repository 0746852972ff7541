//! Application configuration for oobswap.
//!
//! User config lives at `~/.oobswap/oobswap.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OobError, Result};
use crate::types::interval_str;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "oobswap.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".oobswap";

// ---------------------------------------------------------------------------
// Config structs (matching oobswap.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Swap and settle behaviour.
    #[serde(default)]
    pub swap: SwapConfig,
}

/// `[swap]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Settle delay used when a directive does not carry `settle:`.
    #[serde(default = "default_settle_delay", with = "interval_str")]
    pub default_settle_delay: Duration,

    /// Class put on freshly inserted elements until they settle.
    #[serde(default = "default_added_class")]
    pub added_class: String,

    /// Class put on the settle anchor while settling.
    #[serde(default = "default_settling_class")]
    pub settling_class: String,

    /// Class put on a target while its swap is pending.
    #[serde(default = "default_swapping_class")]
    pub swapping_class: String,

    /// Attributes whose old values are kept on a replacement until it settles.
    #[serde(default = "default_attributes_to_settle")]
    pub attributes_to_settle: Vec<String>,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_settle_delay: default_settle_delay(),
            added_class: default_added_class(),
            settling_class: default_settling_class(),
            swapping_class: default_swapping_class(),
            attributes_to_settle: default_attributes_to_settle(),
        }
    }
}

fn default_settle_delay() -> Duration {
    Duration::from_millis(20)
}
fn default_added_class() -> String {
    "htmx-added".into()
}
fn default_settling_class() -> String {
    "htmx-settling".into()
}
fn default_swapping_class() -> String {
    "htmx-swapping".into()
}
fn default_attributes_to_settle() -> Vec<String> {
    ["class", "style", "width", "height"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl SwapConfig {
    /// Reject class names the settle protocol cannot round-trip.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("added_class", &self.added_class),
            ("settling_class", &self.settling_class),
            ("swapping_class", &self.swapping_class),
        ] {
            if value.is_empty() || value.contains(char::is_whitespace) {
                return Err(OobError::config(format!(
                    "{field} must be a single non-empty class name, got {value:?}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.oobswap/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| OobError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.oobswap/oobswap.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| OobError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| OobError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.swap.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OobError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = render_config(&AppConfig::default())?;

    std::fs::write(&path, content).map_err(|e| OobError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Serialize a config back to TOML.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| OobError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let toml_str = render_config(&AppConfig::default()).expect("serialize default config");
        assert!(toml_str.contains("default_settle_delay = \"20ms\""));
        assert!(toml_str.contains("htmx-settling"));
    }

    #[test]
    fn config_roundtrip() {
        let toml_str = render_config(&AppConfig::default()).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.swap, SwapConfig::default());
    }

    #[test]
    fn partial_section_uses_defaults() {
        let toml_str = r#"
[swap]
default_settle_delay = "1s"
added_class = "fresh"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.swap.default_settle_delay, Duration::from_secs(1));
        assert_eq!(config.swap.added_class, "fresh");
        assert_eq!(config.swap.settling_class, "htmx-settling");
        assert_eq!(config.swap.attributes_to_settle.len(), 4);
    }

    #[test]
    fn bad_interval_is_rejected() {
        let toml_str = "[swap]\ndefault_settle_delay = \"soon\"\n";
        let result: std::result::Result<AppConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn class_names_are_validated() {
        let mut swap = SwapConfig::default();
        assert!(swap.validate().is_ok());
        swap.added_class = "two words".into();
        let err = swap.validate().unwrap_err();
        assert!(err.to_string().contains("added_class"));
    }

    #[test]
    fn load_from_missing_path_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/oobswap.toml")).unwrap_err();
        assert!(matches!(err, OobError::Io { .. }));
    }
}
