//! Proximity and catchment analysis.
//!
//! Every computation reprojects geodetic coordinates into a single metric
//! frame (see [`TransverseMercator::hanoi`]) before measuring distances.
//! Calls are pure: nothing is cached between analyses.

mod index;
pub mod projection;
mod proximity;

use serde::Serialize;
use tracing::debug;

use crate::models::{BoundaryRegion, FacilityRecord, GeoPoint};

pub use index::FacilityIndex;
pub use projection::TransverseMercator;
pub use proximity::{
    category_counts, display_meters, facilities_within_radius, nearest_facilities, CategoryCounts,
    ProjectedFacilities, RadiusMatch, RankedFacility,
};

/// Default number of nearest facilities reported
pub const DEFAULT_NEAREST_K: usize = 3;

/// Default catchment radius in meters
pub const DEFAULT_RADIUS_M: f64 = 3000.0;

/// Tunables for a full analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    pub nearest_k: usize,
    pub radius_m: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            nearest_k: DEFAULT_NEAREST_K,
            radius_m: DEFAULT_RADIUS_M,
        }
    }
}

/// Everything the presentation layer needs for one query point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult<'a> {
    pub query: GeoPoint,
    /// Closest facilities, ascending by distance
    pub nearest: Vec<RankedFacility<'a>>,
    pub within_radius: RadiusMatch<'a>,
    pub category_counts: CategoryCounts,
    /// `None` when no boundary was supplied
    pub inside_boundary: Option<bool>,
}

/// Run the nearest ranking, the catchment test, and the category grouping
/// over one projection of the facility set.
pub fn analyze<'a>(
    query: GeoPoint,
    facilities: &'a [FacilityRecord],
    boundary: Option<&BoundaryRegion>,
    params: AnalysisParams,
) -> AnalysisResult<'a> {
    let projected = ProjectedFacilities::new(facilities, TransverseMercator::hanoi());

    let nearest = projected.nearest(query, params.nearest_k);
    let within_radius = projected.within_radius(query, params.radius_m);
    let category_counts = category_counts(within_radius.facilities.iter().map(|r| r.facility));
    let inside_boundary = boundary.map(|b| b.contains(query));

    debug!(
        "Analysis at ({}, {}): nearest={}, within {} m={}, inside_boundary={:?}",
        query.lat,
        query.lon,
        nearest.len(),
        params.radius_m,
        within_radius.count,
        inside_boundary
    );

    AnalysisResult {
        query,
        nearest,
        within_radius,
        category_counts,
        inside_boundary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use geo::{polygon, MultiPolygon};

    fn hanoi_box() -> BoundaryRegion {
        let poly = polygon![
            (x: 105.3, y: 20.5),
            (x: 106.1, y: 20.5),
            (x: 106.1, y: 21.4),
            (x: 105.3, y: 21.4),
            (x: 105.3, y: 20.5),
        ];
        BoundaryRegion::new("Hà Nội", MultiPolygon::new(vec![poly]))
    }

    #[test]
    fn test_analyze_combines_results() {
        let facilities = vec![
            FacilityRecord::new(
                "node/1",
                Some("Bach Mai"),
                Some("hospital"),
                GeoPoint::new(21.0010, 105.8412),
            ),
            FacilityRecord::new(
                "node/2",
                Some("Far clinic"),
                Some("clinic"),
                GeoPoint::new(21.2000, 105.8000),
            ),
            FacilityRecord::new("node/3", None, Some("doctors"), GeoPoint::new(21.0300, 105.8500)),
        ];
        let boundary = hanoi_box();
        let query = GeoPoint::new(21.0285, 105.8542);

        let result = analyze(query, &facilities, Some(&boundary), AnalysisParams::default());

        assert_eq!(result.nearest.len(), 3);
        assert_eq!(result.nearest[0].facility.id, "node/3");
        assert_eq!(result.nearest[1].facility.id, "node/1");
        assert_eq!(result.within_radius.count, 1);
        assert_eq!(result.category_counts.get(&Category::Doctors), Some(&1));
        assert_eq!(result.inside_boundary, Some(true));
    }

    #[test]
    fn test_analyze_matches_standalone_operations() {
        let facilities = vec![
            FacilityRecord::new("a", None, Some("clinic"), GeoPoint::new(21.02, 105.85)),
            FacilityRecord::new("b", None, Some("hospital"), GeoPoint::new(21.05, 105.83)),
        ];
        let query = GeoPoint::new(21.0285, 105.8542);

        let result = analyze(query, &facilities, None, AnalysisParams::default());
        assert_eq!(result.nearest, nearest_facilities(query, &facilities, 3));
        assert_eq!(
            result.within_radius,
            facilities_within_radius(query, &facilities, DEFAULT_RADIUS_M)
        );
        assert_eq!(result.inside_boundary, None);
    }

    #[test]
    fn test_analyze_outside_boundary() {
        let result = analyze(
            GeoPoint::new(10.77, 106.70),
            &[],
            Some(&hanoi_box()),
            AnalysisParams::default(),
        );
        assert!(result.nearest.is_empty());
        assert_eq!(result.within_radius.count, 0);
        assert!(result.category_counts.is_empty());
        assert_eq!(result.inside_boundary, Some(false));
    }
}
