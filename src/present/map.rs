//! Map layers as GeoJSON for the browser map.

use geo::{Coord, LineString, Polygon};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde::Serialize;

use super::{escape_html, radius_label};
use crate::analysis::{AnalysisResult, RankedFacility, TransverseMercator};
use crate::models::{BoundaryRegion, Category, FacilityRecord, GeoPoint};

/// Highlight color for the nearest facilities
pub const NEAREST_COLOR: &str = "darkred";
const USER_COLOR: &str = "blue";
const BOUNDARY_COLOR: &str = "#3388ff";

const FACILITY_MARKER_RADIUS: u32 = 5;
const NEAREST_MARKER_RADIUS: u32 = 9;

pub fn category_color(category: Category) -> &'static str {
    match category {
        Category::Hospital => "red",
        Category::Clinic => "green",
        Category::Doctors => "orange",
        Category::Unknown => "gray",
    }
}

/// One row of the map legend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
}

pub fn legend() -> Vec<LegendEntry> {
    let mut entries: Vec<LegendEntry> = Category::all()
        .iter()
        .map(|c| LegendEntry {
            label: match c {
                Category::Hospital => "Hospital",
                Category::Clinic => "Clinic",
                Category::Doctors => "Doctors",
                Category::Unknown => "Other",
            },
            color: category_color(*c),
        })
        .collect();
    entries.push(LegendEntry {
        label: "Nearest facility",
        color: NEAREST_COLOR,
    });
    entries
}

/// Result list lines: "name — N m — (category)", HTML-escaped
pub fn nearest_lines(nearest: &[RankedFacility<'_>]) -> Vec<String> {
    nearest
        .iter()
        .map(|r| {
            format!(
                "{} — {} m — ({})",
                escape_html(&r.facility.name),
                r.display_meters(),
                r.facility.category
            )
        })
        .collect()
}

fn feature(geometry: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Layers drawn for one analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisLayers {
    pub user_marker: Feature,
    pub catchment: Feature,
    pub nearest: FeatureCollection,
}

/// Builds map layers; circles are constructed in the metric frame
pub struct MapPresenter {
    projection: TransverseMercator,
    circle_segments: usize,
}

impl Default for MapPresenter {
    fn default() -> Self {
        Self {
            projection: TransverseMercator::hanoi(),
            circle_segments: 64,
        }
    }
}

impl MapPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn facility_feature(&self, facility: &FacilityRecord) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), JsonValue::from(facility.id.clone()));
        properties.insert("name".to_string(), JsonValue::from(facility.name.clone()));
        properties.insert(
            "category".to_string(),
            JsonValue::from(facility.category.as_str()),
        );
        properties.insert(
            "color".to_string(),
            JsonValue::from(category_color(facility.category)),
        );
        properties.insert("radius".to_string(), JsonValue::from(FACILITY_MARKER_RADIUS));
        properties.insert(
            "popup".to_string(),
            JsonValue::from(format!(
                "{} ({})",
                escape_html(&facility.name),
                facility.category
            )),
        );
        feature(
            geojson::Value::from(&facility.location.to_point()),
            properties,
        )
    }

    /// Every facility, colored by category
    pub fn facilities_layer(&self, facilities: &[FacilityRecord]) -> FeatureCollection {
        collection(facilities.iter().map(|f| self.facility_feature(f)).collect())
    }

    pub fn boundary_layer(&self, boundary: &BoundaryRegion) -> FeatureCollection {
        let mut properties = JsonObject::new();
        properties.insert("name".to_string(), JsonValue::from(boundary.name.clone()));
        properties.insert("color".to_string(), JsonValue::from(BOUNDARY_COLOR));
        collection(vec![feature(
            geojson::Value::from(&boundary.geometry),
            properties,
        )])
    }

    /// Disk of `radius_m` around `center`, as a WGS84 polygon
    pub fn catchment_polygon(&self, center: GeoPoint, radius_m: f64) -> Polygon<f64> {
        let origin = self.projection.project_point(center);
        let step = std::f64::consts::TAU / self.circle_segments as f64;

        let mut ring: Vec<Coord<f64>> = (0..self.circle_segments)
            .map(|i| {
                let angle = i as f64 * step;
                self.projection.inverse(Coord {
                    x: origin.x() + radius_m * angle.cos(),
                    y: origin.y() + radius_m * angle.sin(),
                })
            })
            .collect();
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }

        Polygon::new(LineString::new(ring), vec![])
    }

    pub fn analysis_layers(&self, result: &AnalysisResult<'_>) -> AnalysisLayers {
        let mut marker = JsonObject::new();
        marker.insert("color".to_string(), JsonValue::from(USER_COLOR));
        marker.insert("popup".to_string(), JsonValue::from("Your location"));
        let user_marker = feature(geojson::Value::from(&result.query.to_point()), marker);

        let radius_m = result.within_radius.radius_m;
        let mut circle = JsonObject::new();
        circle.insert("color".to_string(), JsonValue::from(USER_COLOR));
        circle.insert("radius_m".to_string(), JsonValue::from(radius_m));
        circle.insert(
            "popup".to_string(),
            JsonValue::from(format!("{} radius", radius_label(radius_m))),
        );
        let catchment = feature(
            geojson::Value::from(&self.catchment_polygon(result.query, radius_m)),
            circle,
        );

        let nearest = result
            .nearest
            .iter()
            .map(|r| {
                let mut properties = JsonObject::new();
                properties.insert("id".to_string(), JsonValue::from(r.facility.id.clone()));
                properties.insert("color".to_string(), JsonValue::from(NEAREST_COLOR));
                properties.insert("radius".to_string(), JsonValue::from(NEAREST_MARKER_RADIUS));
                properties.insert("distance_m".to_string(), JsonValue::from(r.distance_m));
                properties.insert(
                    "popup".to_string(),
                    JsonValue::from(format!(
                        "{} — {} m",
                        escape_html(&r.facility.name),
                        r.display_meters()
                    )),
                );
                feature(
                    geojson::Value::from(&r.facility.location.to_point()),
                    properties,
                )
            })
            .collect();

        AnalysisLayers {
            user_marker,
            catchment,
            nearest: collection(nearest),
        }
    }
}
