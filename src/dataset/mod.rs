//! Boundary and facility dataset.
//!
//! The two GeoJSON files in the data directory act as a read-through cache:
//! when both exist they are loaded as-is, otherwise the data is fetched from
//! OpenStreetMap and written there first. There is no invalidation; delete
//! the files (or run `fetch --force`) to refresh.

mod fetch;
mod geojson_io;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::{DataConfig, SourceConfig};
use crate::models::{BoundaryRegion, FacilityRecord};

pub use fetch::{FetchedBoundary, OsmFetcher};
pub use geojson_io::{
    facility_feature, load_boundary, load_facilities, representative_point, save_boundary,
    save_facilities,
};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid GeoJSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("No polygon boundary found in {}", .0.display())]
    NoBoundary(PathBuf),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid service URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{service} returned no usable result for '{query}'")]
    NotFound { service: &'static str, query: String },
}

/// Boundary plus facilities, read-only after load
#[derive(Debug, Clone)]
pub struct Dataset {
    pub boundary: BoundaryRegion,
    pub facilities: Vec<FacilityRecord>,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(boundary: BoundaryRegion, facilities: Vec<FacilityRecord>) -> Self {
        Self {
            boundary,
            facilities,
            loaded_at: Utc::now(),
        }
    }

    /// Both cache files are present
    pub fn is_cached(config: &DataConfig) -> bool {
        config.boundary_path().exists() && config.facilities_path().exists()
    }

    /// Load from the cache files
    pub fn load(config: &DataConfig) -> Result<Self, DatasetError> {
        let boundary = load_boundary(&config.boundary_path())?;
        let facilities = load_facilities(&config.facilities_path())?;
        Ok(Self::new(boundary, facilities))
    }

    /// Write both cache files
    pub fn save(&self, config: &DataConfig) -> Result<(), DatasetError> {
        save_boundary(&config.boundary_path(), &self.boundary)?;
        save_facilities(&config.facilities_path(), &self.facilities)?;
        info!(
            "Wrote {} and {}",
            config.boundary_path().display(),
            config.facilities_path().display()
        );
        Ok(())
    }

    /// Fetch from OpenStreetMap, ignoring any cache
    pub async fn fetch(source: &SourceConfig) -> Result<Self> {
        let fetcher = OsmFetcher::new(source).context("Failed to create OSM client")?;

        let boundary = fetcher
            .fetch_boundary(&source.place)
            .await
            .with_context(|| format!("Failed to fetch boundary for '{}'", source.place))?;
        let facilities = fetcher
            .fetch_facilities(&boundary)
            .await
            .context("Failed to fetch healthcare facilities")?;

        Ok(Self::new(boundary.region, facilities))
    }

    /// Load from the cache, fetching and writing it first when missing
    pub async fn load_or_fetch(data: &DataConfig, source: &SourceConfig) -> Result<Self> {
        if Self::is_cached(data) {
            info!("Loading cached dataset from {}", data.dir.display());
            return Self::load(data).context("Failed to load cached dataset");
        }

        info!("Dataset cache missing, fetching '{}' from OpenStreetMap", source.place);
        let dataset = Self::fetch(source).await?;
        dataset.save(data).context("Failed to write dataset cache")?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use geo::{polygon, MultiPolygon};

    #[test]
    fn test_save_then_load_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = DataConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(!Dataset::is_cached(&config));

        let poly = polygon![
            (x: 105.3, y: 20.5),
            (x: 106.1, y: 20.5),
            (x: 106.1, y: 21.4),
            (x: 105.3, y: 21.4),
        ];
        let dataset = Dataset::new(
            BoundaryRegion::new("Hà Nội", MultiPolygon::new(vec![poly])),
            vec![FacilityRecord::new(
                "node/1",
                Some("Bạch Mai"),
                Some("hospital"),
                GeoPoint::new(21.001, 105.8412),
            )],
        );
        dataset.save(&config).unwrap();
        assert!(Dataset::is_cached(&config));

        let loaded = Dataset::load(&config).unwrap();
        assert_eq!(loaded.facilities, dataset.facilities);
        assert_eq!(loaded.boundary.geometry, dataset.boundary.geometry);
    }

    #[tokio::test]
    async fn test_load_or_fetch_prefers_cache() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let poly = polygon![
            (x: 105.3, y: 20.5),
            (x: 106.1, y: 20.5),
            (x: 106.1, y: 21.4),
        ];
        Dataset::new(BoundaryRegion::new("Hà Nội", MultiPolygon::new(vec![poly])), vec![])
            .save(&data)
            .unwrap();

        // An unreachable source proves nothing is fetched
        let source = SourceConfig {
            nominatim_url: "http://127.0.0.1:9/search".to_string(),
            overpass_url: "http://127.0.0.1:9/api/interpreter".to_string(),
            ..Default::default()
        };
        let dataset = Dataset::load_or_fetch(&data, &source).await.unwrap();
        assert!(dataset.facilities.is_empty());
        assert_eq!(dataset.boundary.name, "Hà Nội");
    }
}
