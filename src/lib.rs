//! Healthreach - healthcare accessibility analysis for Hanoi
//!
//! This library provides the proximity analysis core and the shared types and
//! modules for the serve and fetch binaries.

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod models;
pub mod present;
pub mod session;

pub use analysis::{analyze, AnalysisParams, AnalysisResult};
pub use models::{BoundaryRegion, Category, FacilityRecord, GeoPoint, QueryPoint};
