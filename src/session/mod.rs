//! Per-user interaction state.
//!
//! Each user action maps to one [`Interaction`]; applying it to a
//! [`SessionState`] performs exactly one state change and reports it as a
//! [`Transition`].

mod state;
mod store;

pub use state::{
    Coords, GeolocationReading, Interaction, MapClick, SessionState, Transition,
    LOCATION_UNAVAILABLE_MESSAGE,
};
pub use store::{SessionId, SessionStore};
