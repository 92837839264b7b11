//! Async seams over the prediction backend.
//!
//! [`LaundryApi`](crate::LaundryApi) implements both traits; the orchestrator
//! and the search box only see the traits so tests can swap in fakes.

use async_trait::async_trait;

use crate::types::{
    ApiError, City, CityRequest, FeatureSnapshot, ModelPrediction, RulePrediction,
};

/// The three drying models plus the feature endpoint.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict_rule(&self, request: &CityRequest) -> Result<RulePrediction, ApiError>;

    async fn predict_prophet(&self, request: &CityRequest) -> Result<ModelPrediction, ApiError>;

    async fn predict_xgboost(&self, request: &CityRequest) -> Result<ModelPrediction, ApiError>;

    async fn fetch_features(&self, request: &CityRequest) -> Result<FeatureSnapshot, ApiError>;
}

/// City name lookup used by autocomplete.
#[async_trait]
pub trait CityIndex: Send + Sync {
    /// Matches in server order.
    async fn search_city(&self, query: &str) -> Result<Vec<City>, ApiError>;
}
