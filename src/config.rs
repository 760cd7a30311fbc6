//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then the optional TOML file, then
//! environment variables (a `.env` file is honored).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record store (JSON array of fire records).
    pub data_path: PathBuf,
    /// Coordinate cache (JSON object keyed by `location_firedate`).
    pub cache_path: PathBuf,
    pub geocoding: GeocodingConfig,
    pub map: MapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    /// REST key sent as `Authorization: KakaoAK <key>`.
    pub rest_api_key: String,
    pub timeout_secs: u64,
    /// Minimum pause after each newly converted record in a batch.
    pub throttle_ms: u64,
    /// Pause after each address lookup while placing a region's fires on a map.
    pub address_throttle_ms: u64,
    /// Try the remote transcoding service before the local fits.
    pub remote_transcode: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// JavaScript key embedded in generated map pages.
    pub api_key: String,
    /// Where map pages are written; the system temp dir when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: PathBuf::from("forest_fire_data.json"),
            cache_path: PathBuf::from("coordinate_cache.json"),
            geocoding: GeocodingConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        GeocodingConfig {
            base_url: "https://dapi.kakao.com".to_string(),
            rest_api_key: String::new(),
            timeout_secs: 10,
            throttle_ms: 200,
            address_throttle_ms: 100,
            remote_transcode: false,
        }
    }
}

impl GeocodingConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn address_throttle(&self) -> Duration {
        Duration::from_millis(self.address_throttle_ms)
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Defaults or the given TOML file, with environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| Error::Config(format!("cannot read {}: {e}", p.display())))?;
                Self::from_toml_str(&text)?
            }
            None => Config::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("FOREST_FIRE_DATA_PATH") {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = var("FOREST_FIRE_CACHE_PATH") {
            self.cache_path = PathBuf::from(v);
        }
        if let Some(v) = var("KAKAO_REST_API_KEY") {
            self.geocoding.rest_api_key = v;
        }
        if let Some(v) = var("KAKAO_MAP_API_KEY") {
            self.map.api_key = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            data_path = "/srv/fires.json"

            [geocoding]
            throttle_ms = 0
            remote_transcode = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.data_path, PathBuf::from("/srv/fires.json"));
        assert_eq!(cfg.cache_path, PathBuf::from("coordinate_cache.json"));
        assert_eq!(cfg.geocoding.throttle(), Duration::ZERO);
        assert!(cfg.geocoding.remote_transcode);
        assert_eq!(cfg.geocoding.base_url, "https://dapi.kakao.com");
        assert_eq!(cfg.geocoding.timeout_secs, 10);
        assert_eq!(cfg.geocoding.address_throttle(), Duration::from_millis(100));
    }

    #[test]
    fn bad_toml_is_config_error() {
        assert!(matches!(Config::from_toml_str("data_path = ["), Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("KAKAO_REST_API_KEY", "rest-key"),
            ("FOREST_FIRE_CACHE_PATH", "/tmp/c.json"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.geocoding.rest_api_key, "rest-key");
        assert_eq!(cfg.cache_path, PathBuf::from("/tmp/c.json"));
        assert!(cfg.map.api_key.is_empty());
    }
}
