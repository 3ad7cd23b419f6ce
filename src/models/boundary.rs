//! Area-of-interest boundary (the city polygon).

use geo::{BoundingRect, Contains, MultiPolygon};

use super::GeoPoint;

/// A single boundary region, loaded once and never modified
#[derive(Debug, Clone)]
pub struct BoundaryRegion {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl BoundaryRegion {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Whether the point lies inside the boundary
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.geometry.contains(&point.to_point())
    }

    /// Get the bounding box of this boundary as (min_lon, min_lat, max_lon, max_lat)
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square() -> BoundaryRegion {
        let poly = polygon![
            (x: 105.0, y: 20.5),
            (x: 106.0, y: 20.5),
            (x: 106.0, y: 21.5),
            (x: 105.0, y: 21.5),
            (x: 105.0, y: 20.5),
        ];
        BoundaryRegion::new("Test", MultiPolygon::new(vec![poly]))
    }

    #[test]
    fn test_contains() {
        let region = square();
        assert!(region.contains(GeoPoint::new(21.0285, 105.8542)));
        assert!(!region.contains(GeoPoint::new(22.0, 105.8542)));
    }

    #[test]
    fn test_bbox() {
        assert_eq!(square().bbox(), Some((105.0, 20.5, 106.0, 21.5)));
    }
}
