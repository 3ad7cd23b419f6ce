//! Query point state and the transitions that change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::TransverseMercator;
use crate::models::{PointSource, QueryPoint};

pub const LOCATION_UNAVAILABLE_MESSAGE: &str =
    "Could not get your location. Please allow location access in the browser.";

/// Coordinates block of a browser geolocation reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
}

/// Device geolocation reading: `{coords: {latitude, longitude}}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeolocationReading {
    pub coords: Coords,
}

/// Map click event: `{lat, lng}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapClick {
    pub lat: f64,
    pub lng: f64,
}

/// A discrete user action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    /// "Use my location" pressed; `None` when permission was denied or the
    /// device had no fix
    GpsReading(Option<GeolocationReading>),
    MapClick(MapClick),
    Clear,
}

/// Outcome of applying an interaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum Transition {
    Located { query: QueryPoint },
    LocationUnavailable,
    Rejected,
    /// Valid coordinates too far from Hanoi to measure in meters
    OutOfArea,
    Cleared,
}

impl Transition {
    pub fn kind(&self) -> &'static str {
        match self {
            Transition::Located { .. } => "located",
            Transition::LocationUnavailable => "location_unavailable",
            Transition::Rejected => "rejected",
            Transition::OutOfArea => "out_of_area",
            Transition::Cleared => "cleared",
        }
    }

    /// Message to surface to the user
    pub fn message(&self) -> String {
        match self {
            Transition::Located { query } => match query.source {
                PointSource::Gps => format!("GPS location: ({:.5}, {:.5})", query.lat, query.lon),
                PointSource::MapClick => {
                    format!("Selected location: ({:.5}, {:.5})", query.lat, query.lon)
                }
            },
            Transition::LocationUnavailable => LOCATION_UNAVAILABLE_MESSAGE.to_string(),
            Transition::Rejected => "Coordinates are out of range.".to_string(),
            Transition::OutOfArea => {
                "The selected location is too far from Hanoi to analyse.".to_string()
            }
            Transition::Cleared => {
                "Location cleared, pick a new one to run the analysis.".to_string()
            }
        }
    }

    /// Whether the transition should be shown as a warning
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Transition::LocationUnavailable | Transition::Rejected | Transition::OutOfArea
        )
    }
}

/// State of one user session
#[derive(Debug, Clone)]
pub struct SessionState {
    query: Option<QueryPoint>,
    /// Last time the session was read or changed
    pub last_seen_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            query: None,
            last_seen_at: Utc::now(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen_at = self.last_seen_at.max(now);
    }

    pub fn current_query_point(&self) -> Option<QueryPoint> {
        self.query
    }

    /// Overwrites any previous point
    pub fn set_query_point(&mut self, point: QueryPoint) {
        self.query = Some(point);
    }

    pub fn clear_query_point(&mut self) {
        self.query = None;
    }

    fn locate(&mut self, lat: f64, lon: f64, source: PointSource) -> Transition {
        match QueryPoint::new(lat, lon, source) {
            Some(query) if TransverseMercator::hanoi().covers(query.location()) => {
                self.set_query_point(query);
                Transition::Located { query }
            }
            Some(_) => {
                warn!("{:?} location ({}, {}) is outside the analysis area", source, lat, lon);
                Transition::OutOfArea
            }
            None => {
                warn!("Rejected {:?} location ({}, {})", source, lat, lon);
                Transition::Rejected
            }
        }
    }

    /// Apply one user action
    pub fn apply(&mut self, interaction: Interaction) -> Transition {
        let transition = match interaction {
            Interaction::GpsReading(Some(reading)) => self.locate(
                reading.coords.latitude,
                reading.coords.longitude,
                PointSource::Gps,
            ),
            Interaction::GpsReading(None) => Transition::LocationUnavailable,
            Interaction::MapClick(click) => self.locate(click.lat, click.lng, PointSource::MapClick),
            Interaction::Clear => {
                self.clear_query_point();
                Transition::Cleared
            }
        };
        debug!("Session transition: {:?}", transition);
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gps(lat: f64, lon: f64) -> Interaction {
        Interaction::GpsReading(Some(GeolocationReading {
            coords: Coords {
                latitude: lat,
                longitude: lon,
            },
        }))
    }

    #[test]
    fn test_gps_sets_point() {
        let mut state = SessionState::new();
        assert!(state.current_query_point().is_none());

        let t = state.apply(gps(21.0285, 105.8542));
        assert!(matches!(t, Transition::Located { .. }));

        let q = state.current_query_point().unwrap();
        assert_eq!((q.lat, q.lon, q.source), (21.0285, 105.8542, PointSource::Gps));
    }

    #[test]
    fn test_denied_gps_leaves_point_absent() {
        let mut state = SessionState::new();
        let t = state.apply(Interaction::GpsReading(None));
        assert_eq!(t, Transition::LocationUnavailable);
        assert!(t.is_warning());
        assert_eq!(t.message(), LOCATION_UNAVAILABLE_MESSAGE);
        assert!(state.current_query_point().is_none());
    }

    #[test]
    fn test_click_overwrites_and_clear_resets() {
        let mut state = SessionState::new();
        state.apply(gps(21.0, 105.8));
        state.apply(Interaction::MapClick(MapClick {
            lat: 21.05,
            lng: 105.82,
        }));

        let q = state.current_query_point().unwrap();
        assert_eq!(q.source, PointSource::MapClick);
        assert_eq!((q.lat, q.lon), (21.05, 105.82));
        assert_eq!(
            Transition::Located { query: q }.message(),
            "Selected location: (21.05000, 105.82000)"
        );

        assert_eq!(state.apply(Interaction::Clear), Transition::Cleared);
        assert!(state.current_query_point().is_none());
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut state = SessionState::new();
        state.apply(gps(21.0, 105.8));
        let t = state.apply(Interaction::MapClick(MapClick {
            lat: 120.0,
            lng: 105.8,
        }));
        assert_eq!(t, Transition::Rejected);
        // Previous point survives
        assert_eq!(state.current_query_point().unwrap().lat, 21.0);
    }

    #[test]
    fn test_far_away_location_is_out_of_area() {
        let mut state = SessionState::new();
        state.apply(gps(21.0, 105.8));

        let t = state.apply(gps(40.7, -74.0));
        assert_eq!(t, Transition::OutOfArea);
        assert!(t.is_warning());
        assert_eq!(t.kind(), "out_of_area");
        assert_eq!(state.current_query_point().unwrap().lat, 21.0);

        let t = state.apply(Interaction::MapClick(MapClick {
            lat: 35.7,
            lng: 139.7,
        }));
        assert_eq!(t, Transition::OutOfArea);
    }

    #[test]
    fn test_geolocation_reading_shape() {
        let reading: GeolocationReading =
            serde_json::from_str(r#"{"coords": {"latitude": 21.0, "longitude": 105.8, "accuracy": 20}}"#)
                .unwrap();
        assert_eq!(reading.coords.latitude, 21.0);

        let click: MapClick = serde_json::from_str(r#"{"lat": 21.0, "lng": 105.8}"#).unwrap();
        assert_eq!(click.lng, 105.8);
    }

    #[test]
    fn test_transition_serializes_with_tag() {
        let json = serde_json::to_value(Transition::Cleared).unwrap();
        assert_eq!(json["transition"], Transition::Cleared.kind());
        assert_eq!(Transition::LocationUnavailable.kind(), "location_unavailable");
    }
}
