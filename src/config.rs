//! TOML configuration shared by the serve and fetch binaries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisParams, DEFAULT_NEAREST_K, DEFAULT_RADIUS_M};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub source: SourceConfig,
    pub analysis: AnalysisConfig,
    pub server: ServerConfig,
}

/// Where the cached dataset files live
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub boundary_file: String,
    pub facilities_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            boundary_file: "hanoi.geojson".to_string(),
            facilities_file: "health_facilities.geojson".to_string(),
        }
    }
}

impl DataConfig {
    pub fn boundary_path(&self) -> PathBuf {
        self.dir.join(&self.boundary_file)
    }

    pub fn facilities_path(&self) -> PathBuf {
        self.dir.join(&self.facilities_file)
    }
}

/// OpenStreetMap services used to build the dataset
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    /// Free-form place name resolved with Nominatim
    pub place: String,
    /// `amenity` values counted as healthcare facilities
    pub amenities: Vec<String>,
    pub nominatim_url: String,
    pub overpass_url: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            place: "Hanoi, Vietnam".to_string(),
            amenities: vec![
                "hospital".to_string(),
                "clinic".to_string(),
                "doctors".to_string(),
            ],
            nominatim_url: "https://nominatim.openstreetmap.org/search".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_secs: 180,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub nearest_k: usize,
    pub radius_m: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            nearest_k: DEFAULT_NEAREST_K,
            radius_m: DEFAULT_RADIUS_M,
        }
    }
}

impl From<&AnalysisConfig> for AnalysisParams {
    fn from(config: &AnalysisConfig) -> Self {
        AnalysisParams {
            nearest_k: config.nearest_k,
            radius_m: config.radius_m,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Initial map center as [lat, lon]
    pub map_center: [f64; 2],
    pub map_zoom: u8,
    /// Sessions idle for longer than this are dropped
    pub session_idle_secs: u64,
    /// Upper bound on live sessions; the least recently seen is dropped first
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8501".to_string(),
            map_center: [21.0285, 105.8542],
            map_zoom: 11,
            session_idle_secs: 3600,
            max_sessions: 10_000,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        if config.analysis.nearest_k == 0 {
            anyhow::bail!("analysis.nearest_k must be positive");
        }
        if !config.analysis.radius_m.is_finite() || config.analysis.radius_m <= 0.0 {
            anyhow::bail!("analysis.radius_m must be a positive number of meters");
        }
        if config.server.session_idle_secs == 0 || config.server.max_sessions == 0 {
            anyhow::bail!("server.session_idle_secs and server.max_sessions must be positive");
        }
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.data.boundary_path(), PathBuf::from("./hanoi.geojson"));
        assert_eq!(config.analysis.nearest_k, 3);
        assert_eq!(config.analysis.radius_m, 3000.0);
        assert_eq!(config.source.amenities.len(), 3);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [data]
            dir = "/var/lib/healthreach"

            [analysis]
            radius_m = 5000.0

            [server]
            listen = "0.0.0.0:9000"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.data.facilities_path(),
            PathBuf::from("/var/lib/healthreach/health_facilities.geojson")
        );
        assert_eq!(config.analysis.nearest_k, 3);
        assert_eq!(config.analysis.radius_m, 5000.0);
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.server.map_zoom, 11);
        assert_eq!(config.server.session_idle_secs, 3600);
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../healthreach.example.toml")).unwrap();
        assert_eq!(config.source.place, "Hanoi, Vietnam");
        assert_eq!(config.server.map_center, [21.0285, 105.8542]);
    }

    #[test]
    fn test_rejects_bad_analysis_values() {
        assert!(Config::from_toml("[analysis]\nnearest_k = 0").is_err());
        assert!(Config::from_toml("[analysis]\nradius_m = -10.0").is_err());
        assert!(Config::from_toml("[server]\nmax_sessions = 0").is_err());
    }
}
