use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub business_centers: PathBuf,
    pub providers: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_center")]
    pub center: [f64; 2], // [lat, lng]
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: u8,
    /// Below this zoom markers are clustered.
    #[serde(default = "default_zoom_threshold")]
    pub zoom_threshold: u8,
    /// Percent. Centers with some KT clients but a rate under this are "low".
    #[serde(default = "default_low_penetration_threshold")]
    pub low_penetration_threshold: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: default_center(),
            initial_zoom: default_initial_zoom(),
            zoom_threshold: default_zoom_threshold(),
            low_penetration_threshold: default_low_penetration_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: None,
        }
    }
}

fn default_center() -> [f64; 2] {
    [51.1282, 71.4306]
}

fn default_initial_zoom() -> u8 {
    12
}

pub const ZOOM_THRESHOLD: u8 = 15;

fn default_zoom_threshold() -> u8 {
    ZOOM_THRESHOLD
}

fn default_low_penetration_threshold() -> f64 {
    30.0
}

fn default_port() -> u16 {
    3000
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            business_centers = "data/bc.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.business_centers, PathBuf::from("data/bc.json"));
        assert!(config.input.providers.is_none());
        assert_eq!(config.map.zoom_threshold, 15);
        assert_eq!(config.map.low_penetration_threshold, 30.0);
        assert_eq!(config.server.port, 3000);
        assert!(config.server.static_dir.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            business_centers = "bc.json"
            providers = "providers.json"

            [map]
            zoom_threshold = 13
            low_penetration_threshold = 25.0

            [server]
            port = 8080
            static_dir = "dist"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.providers, Some(PathBuf::from("providers.json")));
        assert_eq!(config.map.zoom_threshold, 13);
        assert_eq!(config.map.initial_zoom, 12);
        assert_eq!(config.map.low_penetration_threshold, 25.0);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("dist")));
    }

    #[test]
    fn missing_input_section_is_an_error() {
        assert!(AppConfig::from_toml("[server]\nport = 1").is_err());
    }
}
