//! The user's selected location.

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Where a query point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    Gps,
    MapClick,
}

/// Location the analysis runs against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub lat: f64,
    pub lon: f64,
    pub source: PointSource,
}

impl QueryPoint {
    /// Returns `None` for non-finite or out-of-range coordinates
    pub fn new(lat: f64, lon: f64, source: PointSource) -> Option<Self> {
        GeoPoint::new(lat, lon)
            .is_valid()
            .then_some(Self { lat, lon, source })
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(QueryPoint::new(21.0285, 105.8542, PointSource::Gps).is_some());
        assert!(QueryPoint::new(-95.0, 105.8542, PointSource::Gps).is_none());
        assert!(QueryPoint::new(21.0, 200.0, PointSource::MapClick).is_none());
        assert!(QueryPoint::new(f64::INFINITY, 0.0, PointSource::MapClick).is_none());
    }
}
