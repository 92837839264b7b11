pub mod city_search;
pub mod geo_resolver;
pub mod prediction_service;

pub use city_search::{CitySearch, SearchState};
pub use geo_resolver::{GeoOutcome, GeoResolver, DETECTING_STATUS};
pub use prediction_service::{
    OrchestratorState, PredictionOrchestrator, RunFailure, RunOutcome,
};
