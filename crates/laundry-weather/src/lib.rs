//! Data model and HTTP clients for the laundry planner.
//!
//! Talks to the prediction backend (city search, the three drying models,
//! weather features) and to Nominatim for reverse geocoding.

pub mod api;
pub mod backend;
pub mod geocode;
pub mod location;
pub mod types;

pub use api::LaundryApi;
pub use backend::{CityIndex, PredictionBackend};
pub use geocode::{NominatimGeocoder, PlaceResolver};
pub use location::{FixedLocation, LocationProvider, NoLocation};
pub use types::*;
