//! Maps weather-crate errors to laundry_core::AppError for consistent user-facing messages.
//! Each error source has its own module; free functions stand in for `From`
//! impls because both types live in other crates.

mod api;
mod location;

pub use api::api_error;
pub use location::location_error;
