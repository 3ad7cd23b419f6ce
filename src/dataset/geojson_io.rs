//! Reading and writing the cached GeoJSON files.

use geo::{Centroid, Geometry, MultiPolygon};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::DatasetError;
use crate::analysis::TransverseMercator;
use crate::models::{BoundaryRegion, FacilityRecord, GeoPoint, UNKNOWN};

fn read_features(path: &Path) -> Result<Vec<Feature>, DatasetError> {
    let content = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson = content.parse::<GeoJson>().map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;

    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![Feature {
            bbox: None,
            geometry: Some(g),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    })
}

fn write_features(path: &Path, features: Vec<Feature>) -> Result<(), DatasetError> {
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let content = serde_json::to_string(&collection)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn string_property<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    feature
        .property(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Convert a GeoJSON geometry to polygons, if it is polygonal
fn as_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.clone()?;
    match Geometry::<f64>::try_from(geometry).ok()? {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    }
}

/// Load the boundary region: the first polygonal feature of the file
pub fn load_boundary(path: &Path) -> Result<BoundaryRegion, DatasetError> {
    let features = read_features(path)?;

    let (feature, geometry) = features
        .iter()
        .find_map(|f| as_multipolygon(f).map(|g| (f, g)))
        .ok_or_else(|| DatasetError::NoBoundary(path.to_path_buf()))?;

    let name = string_property(feature, "display_name")
        .or_else(|| string_property(feature, "name"))
        .unwrap_or(UNKNOWN);

    info!(
        "Loaded boundary '{}' with {} polygon(s) from {}",
        name,
        geometry.0.len(),
        path.display()
    );

    Ok(BoundaryRegion::new(name, geometry))
}

/// Identifier of a facility feature.
///
/// Accepts a string `id` property, an OSM `element_type`/`osmid` pair, or
/// the feature id; falls back to the feature position.
fn facility_id(feature: &Feature, position: usize) -> String {
    if let Some(id) = string_property(feature, "id").filter(|id| id.contains('/')) {
        return id.to_string();
    }

    let element =
        string_property(feature, "element_type").or_else(|| string_property(feature, "element"));
    let osm_id = feature
        .property("osmid")
        .or_else(|| feature.property("id"))
        .and_then(JsonValue::as_i64);
    if let (Some(element), Some(osm_id)) = (element, osm_id) {
        return format!("{}/{}", element, osm_id);
    }

    match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => format!("facility/{}", n),
        None => format!("facility/{}", position),
    }
}

/// Representative point for a facility geometry. Points pass through;
/// anything else is reduced to its centroid in the metric frame.
pub fn representative_point(
    geometry: &Geometry<f64>,
    projection: &TransverseMercator,
) -> Option<GeoPoint> {
    if let Geometry::Point(p) = geometry {
        return Some((*p).into());
    }
    projection
        .project(geometry)
        .centroid()
        .map(|c| projection.unproject_point(c))
}

/// Load facility records, defaulting missing names and categories
pub fn load_facilities(path: &Path) -> Result<Vec<FacilityRecord>, DatasetError> {
    let features = read_features(path)?;
    let projection = TransverseMercator::hanoi();

    let mut facilities = Vec::with_capacity(features.len());
    let mut skipped = 0;

    for (position, feature) in features.iter().enumerate() {
        let location = feature
            .geometry
            .clone()
            .and_then(|g| Geometry::<f64>::try_from(g).ok())
            .and_then(|g| representative_point(&g, &projection))
            .filter(GeoPoint::is_valid);

        let Some(location) = location else {
            skipped += 1;
            continue;
        };

        facilities.push(FacilityRecord::new(
            facility_id(feature, position),
            string_property(feature, "name"),
            string_property(feature, "amenity"),
            location,
        ));
    }

    if skipped > 0 {
        warn!(
            "Skipped {} facility feature(s) without usable geometry in {}",
            skipped,
            path.display()
        );
    }
    info!(
        "Loaded {} facilities from {}",
        facilities.len(),
        path.display()
    );

    Ok(facilities)
}

pub fn save_boundary(path: &Path, boundary: &BoundaryRegion) -> Result<(), DatasetError> {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), JsonValue::from(boundary.name.clone()));

    let feature = Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&boundary.geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };
    write_features(path, vec![feature])
}

/// GeoJSON feature for one facility
pub fn facility_feature(facility: &FacilityRecord) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), JsonValue::from(facility.id.clone()));
    properties.insert("name".to_string(), JsonValue::from(facility.name.clone()));
    properties.insert(
        "amenity".to_string(),
        JsonValue::from(facility.category.as_str()),
    );

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &facility.location.to_point(),
        ))),
        id: Some(Id::String(facility.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn save_facilities(path: &Path, facilities: &[FacilityRecord]) -> Result<(), DatasetError> {
    write_features(path, facilities.iter().map(facility_feature).collect())
}
