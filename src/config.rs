use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for exif-scrub.
///
/// Every field has a default, so a missing file (or a file that only sets
/// a few keys) is fine.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_scrub::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.remove.output_prefix = "stripped-".into();
/// config.map.zoom = 12;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Behaviour of the remove flow.
    pub remove: RemoveConfig,
    /// Rendering of the GPS map page.
    pub map: MapConfig,
    /// Terminal output.
    pub output: OutputConfig,
}

/// Controls what the remover keeps and where it writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveConfig {
    /// File name prefix of the stripped copy (`clean-photo.jpg`).
    pub output_prefix: String,
    /// Re-embed the source's MakerNote into the stripped copy.
    pub keep_maker_note: bool,
    /// Force every pixel of a 4-channel image to full opacity.
    pub force_opaque_alpha: bool,
    /// Also delete IPTC keywords from the *source* file, in place.
    pub scrub_source_iptc: bool,
}

/// Leaflet map settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub zoom: u8,
    /// Tile URL template with `{s}`, `{z}`, `{x}`, `{y}` placeholders.
    pub tile_url: String,
    pub attribution: String,
}

/// Terminal output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use ANSI colors for status lines and tables.
    pub color: bool,
}

impl Default for RemoveConfig {
    fn default() -> Self {
        Self {
            output_prefix: "clean-".to_string(),
            keep_maker_note: true,
            force_opaque_alpha: true,
            scrub_source_iptc: false,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 15,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Resolve the config file path: same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.remove.output_prefix, "clean-");
        assert!(config.remove.keep_maker_note);
        assert!(!config.remove.scrub_source_iptc);
        assert_eq!(config.map.zoom, 15);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"remove": {"output_prefix": "safe-"}, "output": {"color": false}}"#)
            .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.remove.output_prefix, "safe-");
        assert!(config.remove.force_opaque_alpha);
        assert!(!config.output.color);
        assert_eq!(config.map.zoom, 15);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.map.zoom = 9;
        config.remove.scrub_source_iptc = true;

        let written = config.save(Some(&path)).unwrap();
        assert_eq!(written, path);

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.map.zoom, 9);
        assert!(loaded.remove.scrub_source_iptc);
    }

    #[test]
    fn malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
