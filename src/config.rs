use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    Ip,     // IP geolocation
    Manual, // manual_lat / manual_lon
    Off,    // location permission refused
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub mode: LocationMode,
    pub lookup_ip: String, // Empty means "my own address"
    pub manual_lat: f64,
    pub manual_lon: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            mode: LocationMode::Ip,
            lookup_ip: String::new(),
            manual_lat: 48.8566,
            manual_lon: 2.3522,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub endpoint: String,
    pub dataset: String,
    pub rows: u32,
    pub timeout_seconds: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://opendata.paris.fr/api/records/1.0/search/".to_string(),
            dataset: "sanisettesparis".to_string(),
            rows: 100,
            timeout_seconds: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { tick_rate_ms: 150 }
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            },
            Err(_) => info!("No {} found, writing defaults.", path.display()),
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        default_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sanisette-config-{}", std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir.join(name)
    }

    #[test]
    fn missing_file_writes_defaults() {
        let path = scratch_path("missing.toml");
        let _ = fs::remove_file(&path);

        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("sanisettesparis"));
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn partial_file_fills_in_missing_sections() {
        let path = scratch_path("partial.toml");
        fs::write(&path, "[location]\nmode = \"off\"\n\n[ui]\ntick_rate_ms = 50\n").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.location.mode, LocationMode::Off);
        assert_eq!(config.location.lookup_ip, "");
        assert_eq!(config.location.manual_lat, 48.8566);
        assert_eq!(config.ui.tick_rate_ms, 50);
        assert_eq!(config.data, DataConfig::default());
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let path = scratch_path("garbage.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }
}
