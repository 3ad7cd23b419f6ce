//! OpenStreetMap fetcher for the boundary (Nominatim) and the healthcare
//! facilities (Overpass API).

use geo::{Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{representative_point, DatasetError};
use crate::analysis::TransverseMercator;
use crate::config::SourceConfig;
use crate::models::{BoundaryRegion, FacilityRecord};

const USER_AGENT: &str = "Healthreach/0.1 (healthcare accessibility map)";

/// Overpass area ids are offset from the OSM element id by type
const AREA_OFFSET_RELATION: i64 = 3_600_000_000;
const AREA_OFFSET_WAY: i64 = 2_400_000_000;

/// Boundary plus the OSM reference needed to query inside it
#[derive(Debug, Clone)]
pub struct FetchedBoundary {
    pub region: BoundaryRegion,
    /// Overpass area id, when the boundary is a way or relation
    pub area_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    osm_type: String,
    osm_id: i64,
    display_name: String,
    geojson: Option<geojson::Geometry>,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(ll: LatLon) -> Self {
        Coord { x: ll.lon, y: ll.lat }
    }
}

#[derive(Debug, Deserialize)]
struct OverpassMember {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    lat: Option<f64>,
    lon: Option<f64>,
    /// Entries are null for nodes outside the query result
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
    #[serde(default)]
    members: Vec<OverpassMember>,
}

fn ring_coords(geometry: &[Option<LatLon>]) -> Vec<Coord<f64>> {
    geometry.iter().flatten().map(|ll| Coord::from(*ll)).collect()
}

/// Closed rings become polygons; open ways become lines
fn way_geometry(coords: Vec<Coord<f64>>) -> Option<Geometry<f64>> {
    match coords.len() {
        0 => None,
        1 => Some(Geometry::Point(Point(coords[0]))),
        n if n >= 4 && coords.first() == coords.last() => {
            Some(Geometry::Polygon(Polygon::new(LineString::new(coords), vec![])))
        }
        _ => Some(Geometry::LineString(LineString::new(coords))),
    }
}

impl OverpassElement {
    /// Geodetic geometry of the element, if Overpass returned any
    fn geometry(&self) -> Option<Geometry<f64>> {
        match self.kind.as_str() {
            "node" => Some(Geometry::Point(Point::new(self.lon?, self.lat?))),
            "way" => way_geometry(ring_coords(&self.geometry)),
            "relation" => {
                let outers: Vec<Polygon<f64>> = self
                    .members
                    .iter()
                    .filter(|m| m.kind == "way" && (m.role == "outer" || m.role.is_empty()))
                    .filter_map(|m| match way_geometry(ring_coords(&m.geometry))? {
                        Geometry::Polygon(p) => Some(p),
                        _ => None,
                    })
                    .collect();

                if !outers.is_empty() {
                    return Some(Geometry::MultiPolygon(MultiPolygon::new(outers)));
                }

                // Unassembled relation: fall back to every member coordinate
                let points: Vec<Point<f64>> = self
                    .members
                    .iter()
                    .flat_map(|m| {
                        let node = match (m.lon, m.lat) {
                            (Some(lon), Some(lat)) => Some(Coord { x: lon, y: lat }),
                            _ => None,
                        };
                        node.into_iter().chain(ring_coords(&m.geometry))
                    })
                    .map(Point)
                    .collect();

                (!points.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(points)))
            }
            _ => None,
        }
    }

    fn into_facility(self, projection: &TransverseMercator) -> Option<FacilityRecord> {
        let geometry = self.geometry()?;
        let location = representative_point(&geometry, projection)?;
        Some(FacilityRecord::new(
            format!("{}/{}", self.kind, self.id),
            self.tags.get("name").map(String::as_str),
            self.tags.get("amenity").map(String::as_str),
            location,
        ))
    }
}

/// Build the Overpass QL query for the configured amenities
fn overpass_query(amenities: &[String], scope: &str, timeout_secs: u64) -> String {
    format!(
        r#"[out:json][timeout:{timeout}];
{scope}
nwr["amenity"~"^({amenities})$"]{filter};
out tags geom;"#,
        timeout = timeout_secs,
        scope = scope,
        amenities = amenities.join("|"),
        filter = if scope.is_empty() { "" } else { "(area.searchArea)" },
    )
}

/// Fetches boundary and facility data from OSM services
pub struct OsmFetcher {
    client: Client,
    nominatim_url: Url,
    overpass_url: Url,
    amenities: Vec<String>,
    timeout_secs: u64,
}

impl OsmFetcher {
    pub fn new(source: &SourceConfig) -> Result<Self, DatasetError> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(source.timeout_secs))
                .build()?,
            nominatim_url: Url::parse(&source.nominatim_url)?,
            overpass_url: Url::parse(&source.overpass_url)?,
            amenities: source.amenities.clone(),
            timeout_secs: source.timeout_secs,
        })
    }

    /// GET a JSON document, retrying once on transport errors
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, DatasetError> {
        let mut attempts = 0;
        let max_attempts = 2;

        loop {
            attempts += 1;
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let response = response.error_for_status()?;
                    return Ok(response.json::<T>().await?);
                }
                Err(e) if attempts < max_attempts => {
                    warn!(
                        "Request to {} failed (attempt {}/{}): {}",
                        url.host_str().unwrap_or("?"),
                        attempts,
                        max_attempts,
                        e
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Resolve a place name to its boundary polygon
    pub async fn fetch_boundary(&self, place: &str) -> Result<FetchedBoundary, DatasetError> {
        let url = Url::parse_with_params(
            self.nominatim_url.as_str(),
            &[
                ("q", place),
                ("format", "jsonv2"),
                ("polygon_geojson", "1"),
                ("limit", "5"),
            ],
        )?;

        info!("Resolving boundary for '{}'", place);
        let places: Vec<NominatimPlace> = self.get_json(url).await?;

        for candidate in places {
            let Some(geometry) = candidate.geojson else {
                continue;
            };
            let geometry = match Geometry::<f64>::try_from(geometry) {
                Ok(Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
                Ok(Geometry::MultiPolygon(mp)) => mp,
                _ => {
                    debug!("Skipping non-polygonal result {}", candidate.display_name);
                    continue;
                }
            };

            let area_id = match candidate.osm_type.as_str() {
                "relation" => Some(AREA_OFFSET_RELATION + candidate.osm_id),
                "way" => Some(AREA_OFFSET_WAY + candidate.osm_id),
                _ => None,
            };

            info!(
                "Boundary: {} ({}/{})",
                candidate.display_name, candidate.osm_type, candidate.osm_id
            );
            return Ok(FetchedBoundary {
                region: BoundaryRegion::new(candidate.display_name, geometry),
                area_id,
            });
        }

        Err(DatasetError::NotFound {
            service: "Nominatim",
            query: place.to_string(),
        })
    }

    /// Fetch every healthcare facility inside the boundary
    pub async fn fetch_facilities(
        &self,
        boundary: &FetchedBoundary,
    ) -> Result<Vec<FacilityRecord>, DatasetError> {
        let query = match (boundary.area_id, boundary.region.bbox()) {
            (Some(area), _) => overpass_query(
                &self.amenities,
                &format!("area(id:{})->.searchArea;", area),
                self.timeout_secs,
            ),
            (None, Some((min_lon, min_lat, max_lon, max_lat))) => format!(
                "[bbox:{},{},{},{}]{}",
                min_lat,
                min_lon,
                max_lat,
                max_lon,
                overpass_query(&self.amenities, "", self.timeout_secs)
            ),
            (None, None) => {
                return Err(DatasetError::NotFound {
                    service: "Overpass",
                    query: boundary.region.name.clone(),
                })
            }
        };
        debug!("Overpass query:\n{}", query);

        let url = Url::parse_with_params(self.overpass_url.as_str(), &[("data", query.as_str())])?;
        let response: OverpassResponse = self.get_json(url).await?;
        info!("Overpass returned {} elements", response.elements.len());

        let projection = TransverseMercator::hanoi();
        let restrict_to_boundary = boundary.area_id.is_none();

        let mut skipped = 0;
        let facilities: Vec<FacilityRecord> = response
            .elements
            .into_iter()
            .filter_map(|el| {
                let facility = el.into_facility(&projection);
                if facility.is_none() {
                    skipped += 1;
                }
                facility
            })
            .filter(|f| !restrict_to_boundary || boundary.region.contains(f.location))
            .collect();

        if skipped > 0 {
            warn!("Skipped {} elements without geometry", skipped);
        }
        info!("Fetched {} healthcare facilities", facilities.len());

        Ok(facilities)
    }
}
