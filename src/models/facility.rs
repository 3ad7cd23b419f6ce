//! Healthcare facility records.

use geo::Point;
use serde::{Deserialize, Serialize};

/// Placeholder used for any missing name or category.
pub const UNKNOWN: &str = "Unknown";

/// Geographic point (lat/lon, WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// As a geo point (x = lon, y = lat)
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

impl From<Point<f64>> for GeoPoint {
    fn from(p: Point<f64>) -> Self {
        Self {
            lat: p.y(),
            lon: p.x(),
        }
    }
}

/// Facility type, taken from the OSM `amenity` tag
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Category {
    #[serde(rename = "hospital")]
    Hospital,
    #[serde(rename = "clinic")]
    Clinic,
    #[serde(rename = "doctors")]
    Doctors,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Category {
    /// Map an `amenity` value to a category. Absent, empty, or unrecognised
    /// values become `Unknown`.
    pub fn from_tag(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("hospital") => Category::Hospital,
            Some("clinic") => Category::Clinic,
            Some("doctors") => Category::Doctors,
            _ => Category::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hospital => "hospital",
            Category::Clinic => "clinic",
            Category::Doctors => "doctors",
            Category::Unknown => UNKNOWN,
        }
    }

    /// All categories in display order
    pub fn all() -> &'static [Category] {
        &[
            Category::Hospital,
            Category::Clinic,
            Category::Doctors,
            Category::Unknown,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A healthcare facility as loaded from the dataset.
///
/// Optional attributes are resolved when the record is built, so analysis
/// never sees a missing name or category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    /// Source identifier: "{osm_type}/{osm_id}" or "facility/{n}"
    pub id: String,

    /// Display name, "Unknown" when the source had none
    pub name: String,

    pub category: Category,

    /// Representative point (centroid for non-point features)
    pub location: GeoPoint,
}

impl FacilityRecord {
    /// Build a record from raw, possibly missing attributes
    pub fn new(
        id: impl Into<String>,
        name: Option<&str>,
        amenity: Option<&str>,
        location: GeoPoint,
    ) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();

        Self {
            id: id.into(),
            name,
            category: Category::from_tag(amenity),
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_attributes_default_to_unknown() {
        let record = FacilityRecord::new("node/1", None, None, GeoPoint::new(21.0, 105.8));
        assert_eq!(record.name, UNKNOWN);
        assert_eq!(record.category, Category::Unknown);

        let record = FacilityRecord::new("node/2", Some("  "), Some(""), GeoPoint::new(21.0, 105.8));
        assert_eq!(record.name, UNKNOWN);
        assert_eq!(record.category, Category::Unknown);
    }

    #[test]
    fn test_category_from_tag() {
        assert_eq!(Category::from_tag(Some("hospital")), Category::Hospital);
        assert_eq!(Category::from_tag(Some("clinic")), Category::Clinic);
        assert_eq!(Category::from_tag(Some("doctors")), Category::Doctors);
        assert_eq!(Category::from_tag(Some("pharmacy")), Category::Unknown);
        assert_eq!(Category::from_tag(Some("Unknown")), Category::Unknown);
    }

    #[test]
    fn test_category_serializes_as_tag() {
        let json = serde_json::to_string(&Category::Doctors).unwrap();
        assert_eq!(json, "\"doctors\"");
        let json = serde_json::to_string(&Category::Unknown).unwrap();
        assert_eq!(json, "\"Unknown\"");
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(21.0285, 105.8542).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
    }
}
