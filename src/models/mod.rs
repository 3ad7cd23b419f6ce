//! Core data models for the accessibility analysis.

pub mod boundary;
pub mod facility;
pub mod query;

pub use boundary::BoundaryRegion;
pub use facility::{Category, FacilityRecord, GeoPoint, UNKNOWN};
pub use query::{PointSource, QueryPoint};
