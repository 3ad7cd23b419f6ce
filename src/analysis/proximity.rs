//! Nearest-facility ranking and catchment membership.

use std::collections::BTreeMap;

use geo::{Distance, Euclidean, Point};
use serde::Serialize;
use tracing::{debug, warn};

use super::index::FacilityIndex;
use super::projection::TransverseMercator;
use crate::models::{Category, FacilityRecord, GeoPoint};

/// A facility paired with its distance to the query point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedFacility<'a> {
    pub facility: &'a FacilityRecord,
    pub distance_m: f64,
}

impl RankedFacility<'_> {
    /// Distance truncated to whole meters, for display
    pub fn display_meters(&self) -> u64 {
        display_meters(self.distance_m)
    }
}

/// Facilities inside the catchment disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiusMatch<'a> {
    pub radius_m: f64,
    pub count: usize,
    /// Members in input order
    pub facilities: Vec<RankedFacility<'a>>,
}

/// Facility counts per category
pub type CategoryCounts = BTreeMap<Category, usize>;

/// Truncate a metric distance to whole meters
pub fn display_meters(distance_m: f64) -> u64 {
    if distance_m.is_finite() && distance_m > 0.0 {
        distance_m.trunc() as u64
    } else {
        0
    }
}

/// Facility set reprojected into the metric frame.
///
/// Built once per analysis so the ranking and radius test share the same
/// projected positions; never kept between analyses.
pub struct ProjectedFacilities<'a> {
    facilities: &'a [FacilityRecord],
    points: Vec<Point<f64>>,
    projection: TransverseMercator,
}

impl<'a> ProjectedFacilities<'a> {
    pub fn new(facilities: &'a [FacilityRecord], projection: TransverseMercator) -> Self {
        let points = facilities
            .iter()
            .map(|f| projection.project_point(f.location))
            .collect();

        Self {
            facilities,
            points,
            projection,
        }
    }

    /// Query projected into the metric frame, or `None` when the frame does
    /// not cover it
    fn project_query(&self, query: GeoPoint) -> Option<Point<f64>> {
        if self.projection.covers(query) {
            Some(self.projection.project_point(query))
        } else {
            warn!(
                "Query ({}, {}) is outside EPSG:{}, no distances computed",
                query.lat, query.lon, self.projection.epsg
            );
            None
        }
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    /// Planar distance in meters from the projected query to every facility
    fn distances_from(&self, query: Point<f64>) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| Euclidean.distance(query, *p))
            .collect()
    }

    /// The `k` closest facilities, ascending by distance; equal distances
    /// keep input order. Empty when the query is outside the metric frame.
    pub fn nearest(&self, query: GeoPoint, k: usize) -> Vec<RankedFacility<'a>> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let Some(origin) = self.project_query(query) else {
            return Vec::new();
        };
        let distances = self.distances_from(origin);

        let mut order: Vec<usize> = (0..distances.len()).collect();
        // Stable sort: first seen wins on ties
        order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
        order.truncate(k);

        order
            .into_iter()
            .map(|i| RankedFacility {
                facility: &self.facilities[i],
                distance_m: distances[i],
            })
            .collect()
    }

    /// Facilities whose distance to the query is at most `radius_m`
    pub fn within_radius(&self, query: GeoPoint, radius_m: f64) -> RadiusMatch<'a> {
        let empty = RadiusMatch {
            radius_m,
            count: 0,
            facilities: Vec::new(),
        };
        if !radius_m.is_finite() || radius_m < 0.0 || self.is_empty() {
            return empty;
        }
        let Some(origin) = self.project_query(query) else {
            return empty;
        };
        let index = FacilityIndex::build(&self.points);

        // The index narrows the candidates; membership uses the same
        // distance the ranking uses
        let facilities: Vec<RankedFacility<'a>> = index
            .candidates_within(origin, radius_m)
            .into_iter()
            .map(|i| RankedFacility {
                facility: &self.facilities[i],
                distance_m: Euclidean.distance(origin, self.points[i]),
            })
            .filter(|r| r.distance_m <= radius_m)
            .collect();

        debug!(
            "Radius query at ({}, {}): {} of {} facilities within {} m",
            query.lat,
            query.lon,
            facilities.len(),
            self.len(),
            radius_m
        );

        RadiusMatch {
            radius_m,
            count: facilities.len(),
            facilities,
        }
    }
}

/// Rank the `k` facilities closest to `query`.
///
/// Fewer than `k` facilities returns all of them; an empty set returns an
/// empty list.
pub fn nearest_facilities<'a>(
    query: GeoPoint,
    facilities: &'a [FacilityRecord],
    k: usize,
) -> Vec<RankedFacility<'a>> {
    ProjectedFacilities::new(facilities, TransverseMercator::hanoi()).nearest(query, k)
}

/// Subset of facilities inside the disk of `radius_m` around `query`
/// (boundary inclusive)
pub fn facilities_within_radius<'a>(
    query: GeoPoint,
    facilities: &'a [FacilityRecord],
    radius_m: f64,
) -> RadiusMatch<'a> {
    ProjectedFacilities::new(facilities, TransverseMercator::hanoi()).within_radius(query, radius_m)
}

/// Count facilities per category
pub fn category_counts<'a, I>(subset: I) -> CategoryCounts
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let mut counts = CategoryCounts::new();
    for facility in subset {
        *counts.entry(facility.category).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNKNOWN;
    use geo::Coord;

    const CENTER: GeoPoint = GeoPoint {
        lat: 21.0285,
        lon: 105.8542,
    };

    /// Facility placed `east_m` / `north_m` meters from the center in the metric frame
    fn facility_at(id: &str, amenity: Option<&str>, east_m: f64, north_m: f64) -> FacilityRecord {
        let proj = TransverseMercator::hanoi();
        let origin = proj.forward(CENTER.to_point().0);
        let c = proj.inverse(Coord {
            x: origin.x + east_m,
            y: origin.y + north_m,
        });
        FacilityRecord::new(id, Some(id), amenity, GeoPoint::new(c.y, c.x))
    }

    fn scenario() -> Vec<FacilityRecord> {
        vec![
            facility_at("far", None, 0.0, 5000.0),
            facility_at("hospital", Some("hospital"), 500.0, 0.0),
            facility_at("clinic", Some("clinic"), -720.0, -960.0),
        ]
    }

    #[test]
    fn test_scenario_nearest() {
        let facilities = scenario();
        let nearest = nearest_facilities(CENTER, &facilities, 3);

        let ids: Vec<&str> = nearest.iter().map(|r| r.facility.id.as_str()).collect();
        assert_eq!(ids, vec!["hospital", "clinic", "far"]);

        let expected = [500.0, 1200.0, 5000.0];
        for (r, want) in nearest.iter().zip(expected) {
            assert!((r.distance_m - want).abs() < 0.01, "{} vs {}", r.distance_m, want);
        }

        assert_eq!(nearest[0].facility.category, Category::Hospital);
        assert_eq!(nearest[1].facility.category, Category::Clinic);
        assert_eq!(nearest[2].facility.category, Category::Unknown);
        assert_eq!(nearest[2].facility.category.as_str(), UNKNOWN);
    }

    #[test]
    fn test_scenario_radius_and_counts() {
        let facilities = scenario();
        let matched = facilities_within_radius(CENTER, &facilities, 3000.0);

        assert_eq!(matched.count, 2);
        let ids: Vec<&str> = matched
            .facilities
            .iter()
            .map(|r| r.facility.id.as_str())
            .collect();
        assert_eq!(ids, vec!["hospital", "clinic"]);

        let counts = category_counts(matched.facilities.iter().map(|r| r.facility));
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get(&Category::Hospital), Some(&1));
        assert_eq!(counts.get(&Category::Clinic), Some(&1));
    }

    #[test]
    fn test_empty_facility_set() {
        let nearest = nearest_facilities(CENTER, &[], 3);
        assert!(nearest.is_empty());

        let matched = facilities_within_radius(CENTER, &[], 3000.0);
        assert_eq!(matched.count, 0);
        assert!(matched.facilities.is_empty());

        assert!(category_counts(std::iter::empty::<&FacilityRecord>()).is_empty());
    }

    #[test]
    fn test_fewer_than_k() {
        let facilities = vec![
            facility_at("b", Some("clinic"), 800.0, 0.0),
            facility_at("a", Some("hospital"), 100.0, 0.0),
        ];
        let nearest = nearest_facilities(CENTER, &facilities, 3);
        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest[0].facility.id, "a");
        assert_eq!(nearest[1].facility.id, "b");

        assert!(nearest_facilities(CENTER, &facilities, 0).is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let facilities = vec![
            facility_at("first", Some("clinic"), 0.0, 0.0),
            facility_at("second", Some("clinic"), 0.0, 0.0),
            facility_at("third", Some("clinic"), 0.0, 0.0),
        ];
        let nearest = nearest_facilities(CENTER, &facilities, 2);
        let ids: Vec<&str> = nearest.iter().map(|r| r.facility.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_nearest_is_idempotent_and_ordered() {
        let facilities: Vec<FacilityRecord> = (0..40)
            .map(|i| {
                let angle = i as f64 * 0.7;
                let r = 150.0 * ((i * 7) % 23) as f64 + 50.0;
                facility_at(&format!("f{}", i), Some("doctors"), r * angle.cos(), r * angle.sin())
            })
            .collect();

        let first = nearest_facilities(CENTER, &facilities, 5);
        let second = nearest_facilities(CENTER, &facilities, 5);
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);

        for pair in first.windows(2) {
            assert!(pair[0].distance_m <= pair[1].distance_m);
        }

        // Every returned distance is no greater than any non-returned one
        let all = nearest_facilities(CENTER, &facilities, facilities.len());
        let worst_kept = first.last().map(|r| r.distance_m).unwrap();
        for r in &all[5..] {
            assert!(worst_kept <= r.distance_m);
        }
    }

    #[test]
    fn test_radius_boundary_consistency() {
        let facilities: Vec<FacilityRecord> = (0..60)
            .map(|i| {
                let angle = i as f64 * 0.37;
                let r = 100.0 * i as f64;
                facility_at(&format!("f{}", i), None, r * angle.cos(), r * angle.sin())
            })
            .collect();

        let radius = 2500.0;
        let projected = ProjectedFacilities::new(&facilities, TransverseMercator::hanoi());
        let matched = projected.within_radius(CENTER, radius);
        let all = projected.nearest(CENTER, facilities.len());

        let eps = 1e-6;
        let member_ids: Vec<&str> = matched
            .facilities
            .iter()
            .map(|r| r.facility.id.as_str())
            .collect();
        for r in &all {
            if member_ids.contains(&r.facility.id.as_str()) {
                assert!(r.distance_m <= radius + eps);
            } else {
                assert!(r.distance_m > radius - eps);
            }
        }

        let counts = category_counts(matched.facilities.iter().map(|r| r.facility));
        assert_eq!(counts.values().sum::<usize>(), matched.count);
    }

    #[test]
    fn test_invalid_radius_is_empty() {
        let facilities = scenario();
        assert_eq!(facilities_within_radius(CENTER, &facilities, -1.0).count, 0);
        assert_eq!(
            facilities_within_radius(CENTER, &facilities, f64::NAN).count,
            0
        );
    }

    #[test]
    fn test_query_outside_metric_frame_is_empty() {
        let facilities = scenario();
        let new_york = GeoPoint::new(40.7, -74.0);

        assert!(nearest_facilities(new_york, &facilities, 3).is_empty());
        let within = facilities_within_radius(new_york, &facilities, 1.0e8);
        assert_eq!(within.count, 0);
        assert!(within.facilities.is_empty());
    }

    #[test]
    fn test_display_meters_truncates() {
        assert_eq!(display_meters(1199.9), 1199);
        assert_eq!(display_meters(0.4), 0);
        assert_eq!(display_meters(f64::NAN), 0);
    }
}
