//! HTTP client for the laundry prediction backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::backend::{CityIndex, PredictionBackend};
use crate::types::{
    ApiError, City, CityRequest, FeatureSnapshot, ModelEvaluation, ModelPrediction,
    RulePrediction,
};

const SEARCH_PATH: &str = "api/search_city";
const RULE_PATH: &str = "api/predict/rule";
const PROPHET_PATH: &str = "api/predict/prophet";
const XGBOOST_PATH: &str = "api/predict/xgboost";
const FEATURES_PATH: &str = "api/features";
const EVALUATE_PATH: &str = "api/evaluate";

/// Client for the search, prediction, feature and evaluation endpoints.
///
/// All endpoints share one origin; cloning is cheap.
#[derive(Debug, Clone)]
pub struct LaundryApi {
    base_url: Url,
    client: Arc<Client>,
}

impl LaundryApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        // join() replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Search the city index. Results keep the server's order.
    pub async fn search_city(&self, query: &str) -> Result<Vec<City>, ApiError> {
        tracing::debug!("Searching cities for {:?}", query);

        let url = self.base_url.join(SEARCH_PATH)?;
        let response = self.client.get(url).query(&[("q", query)]).send().await?;
        let cities: Vec<City> = check_response(response).await?.json().await?;

        tracing::debug!("City search {:?} returned {} matches", query, cities.len());
        Ok(cities)
    }

    pub async fn predict_rule(&self, request: &CityRequest) -> Result<RulePrediction, ApiError> {
        self.post_json(RULE_PATH, request).await
    }

    pub async fn predict_prophet(
        &self,
        request: &CityRequest,
    ) -> Result<ModelPrediction, ApiError> {
        self.post_json(PROPHET_PATH, request).await
    }

    pub async fn predict_xgboost(
        &self,
        request: &CityRequest,
    ) -> Result<ModelPrediction, ApiError> {
        self.post_json(XGBOOST_PATH, request).await
    }

    pub async fn fetch_features(&self, request: &CityRequest) -> Result<FeatureSnapshot, ApiError> {
        self.post_json(FEATURES_PATH, request).await
    }

    /// Offline error metrics for the trained models.
    pub async fn evaluate(&self) -> Result<ModelEvaluation, ApiError> {
        let url = self.base_url.join(EVALUATE_PATH)?;
        let response = self.client.get(url).send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        request: &CityRequest,
    ) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        tracing::debug!("POST {} for {:?}", url, request.city);

        let response = self.client.post(url).json(request).send().await?;
        Ok(check_response(response).await?.json().await?)
    }
}

/// Turn non-2xx responses into [`ApiError::Status`], preferring the
/// backend's `detail` field over the raw body.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or(body);

    tracing::debug!("Backend returned {}: {}", status, message);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PredictionBackend for LaundryApi {
    async fn predict_rule(&self, request: &CityRequest) -> Result<RulePrediction, ApiError> {
        LaundryApi::predict_rule(self, request).await
    }

    async fn predict_prophet(&self, request: &CityRequest) -> Result<ModelPrediction, ApiError> {
        LaundryApi::predict_prophet(self, request).await
    }

    async fn predict_xgboost(&self, request: &CityRequest) -> Result<ModelPrediction, ApiError> {
        LaundryApi::predict_xgboost(self, request).await
    }

    async fn fetch_features(&self, request: &CityRequest) -> Result<FeatureSnapshot, ApiError> {
        LaundryApi::fetch_features(self, request).await
    }
}

#[async_trait]
impl CityIndex for LaundryApi {
    async fn search_city(&self, query: &str) -> Result<Vec<City>, ApiError> {
        LaundryApi::search_city(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = LaundryApi::new("http://localhost:8000/laundry", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url().as_str(), "http://localhost:8000/laundry/");
        assert_eq!(
            api.base_url().join(RULE_PATH).unwrap().as_str(),
            "http://localhost:8000/laundry/api/predict/rule"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = LaundryApi::new("not a url", Duration::from_secs(1));
        assert!(err.is_err());
    }
}
