//! Session logic for the laundry planner, independent of any front-end.

pub mod app_services;
pub mod error_mapping;
pub mod models;
pub mod services;

pub use app_services::AppServices;
pub use models::city_selection::{CitySelection, Selection, SelectionSource};
pub use models::result_model::{present, render_text, ResultView};
pub use services::{
    CitySearch, GeoOutcome, GeoResolver, OrchestratorState, PredictionOrchestrator, RunFailure,
    RunOutcome, SearchState, DETECTING_STATUS,
};
