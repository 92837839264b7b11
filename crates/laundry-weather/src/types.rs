use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload used in place of a model result when its call failed.
pub const NOT_AVAILABLE: &str = "not available";

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A city returned by the backend's search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl City {
    /// Candidate list label, e.g. `London, GB (51.51, -0.13)`.
    pub fn label(&self) -> String {
        match self.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => format!(
                "{}, {} ({:.2}, {:.2})",
                self.name, country, self.lat, self.lon
            ),
            None => format!("{} ({:.2}, {:.2})", self.name, self.lat, self.lon),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

/// Body shared by the prediction and feature endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRequest {
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl CityRequest {
    pub fn new(city: impl Into<String>, coordinates: Option<Coordinates>) -> Self {
        Self {
            city: city.into(),
            lat: coordinates.map(|c| c.lat),
            lon: coordinates.map(|c| c.lon),
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.lat?, self.lon?))
    }
}

/// Response of the rule-based model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulePrediction {
    pub safe_to_dry_outside: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tomorrow_rain_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Any other fields the backend sent, kept for the raw payload view
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of the Prophet and XGBoost models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub safe_to_dry_outside: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_rain_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of one optional model call.
///
/// Serializes to the model payload, or to `{"error": "..."}` when the call failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Available(ModelPrediction),
    Unavailable { error: String },
}

impl PredictionResult {
    pub fn not_available() -> Self {
        Self::Unavailable {
            error: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn safe_to_dry_outside(&self) -> Option<bool> {
        match self {
            Self::Available(p) => Some(p.safe_to_dry_outside),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn predicted_rain_mm(&self) -> Option<f64> {
        match self {
            Self::Available(p) => p.predicted_rain_mm,
            Self::Unavailable { .. } => None,
        }
    }
}

/// Numeric model inputs for tomorrow, as computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherFeatures {
    #[serde(default)]
    pub temp_mean_tomorrow: Option<f64>,
    #[serde(default)]
    pub humidity_mean_tomorrow: Option<f64>,
    #[serde(default)]
    pub wind_speed_mean_tomorrow: Option<f64>,
    #[serde(default)]
    pub rain_lag_1: Option<f64>,
    #[serde(default)]
    pub dayofyear_tomorrow: Option<f64>,
}

/// Location metadata plus the feature vector for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub features: WeatherFeatures,
}

impl FeatureSnapshot {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.lat?, self.lon?))
    }
}

/// Merged output of one orchestration run.
///
/// The rule slot is never a failure: a failed rule call prevents the
/// snapshot from being built at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSnapshot {
    pub run: u64,
    pub city: String,
    pub rule: RulePrediction,
    pub prophet: PredictionResult,
    pub xgb: PredictionResult,
    pub fetched_at: DateTime<Utc>,
}

/// Error metrics for one model, or the reason it could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelScore {
    Metrics {
        #[serde(rename = "MAE")]
        mae: f64,
        #[serde(rename = "RMSE")]
        rmse: f64,
    },
    Failed {
        error: String,
    },
}

/// Response of the backend's offline model evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub results: BTreeMap<String, ModelScore>,
    #[serde(default)]
    pub best: Option<String>,
    #[serde(default)]
    pub best_mae: Option<f64>,
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Backend and geocoder HTTP errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Url(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_city_request_omits_missing_coordinates() {
        let req = CityRequest::new("London", None);
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"city": "London"}));

        let req = CityRequest::new("London", Some(Coordinates::new(51.5, -0.12)));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"city": "London", "lat": 51.5, "lon": -0.12})
        );
    }

    #[test]
    fn test_city_label() {
        let city = City {
            id: Some(2643743),
            name: "London".into(),
            country: Some("GB".into()),
            lat: 51.50853,
            lon: -0.12574,
        };
        assert_eq!(city.label(), "London, GB (51.51, -0.13)");

        let nowhere = City {
            country: None,
            ..city
        };
        assert_eq!(nowhere.label(), "London (51.51, -0.13)");
    }

    #[test]
    fn test_city_tolerates_null_id_and_country() {
        let city: City = serde_json::from_value(json!({
            "id": null, "name": "Oslo", "country": null, "lat": 59.91, "lon": 10.75
        }))
        .unwrap();
        assert_eq!(city.id, None);
        assert_eq!(city.country, None);
    }

    #[test]
    fn test_rule_prediction_keeps_extra_fields() {
        let rule: RulePrediction = serde_json::from_value(json!({
            "city": "London",
            "tomorrow_rain_mm": 0.4,
            "safe_to_dry_outside": true,
            "threshold_mm": 1.0
        }))
        .unwrap();

        assert!(rule.safe_to_dry_outside);
        assert_eq!(rule.tomorrow_rain_mm, Some(0.4));
        assert_eq!(rule.extra.get("threshold_mm"), Some(&json!(1.0)));

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["threshold_mm"], json!(1.0));
    }

    #[test]
    fn test_prediction_result_variants_deserialize() {
        let ok: PredictionResult = serde_json::from_value(json!({
            "safe_to_dry_outside": false, "predicted_rain_mm": 3.2
        }))
        .unwrap();
        assert_eq!(ok.safe_to_dry_outside(), Some(false));
        assert_eq!(ok.predicted_rain_mm(), Some(3.2));

        let failed: PredictionResult =
            serde_json::from_value(json!({"error": "not available"})).unwrap();
        assert_eq!(failed, PredictionResult::not_available());
        assert_eq!(failed.safe_to_dry_outside(), None);
    }

    #[test]
    fn test_not_available_serializes_as_error_object() {
        let value = serde_json::to_value(PredictionResult::not_available()).unwrap();
        assert_eq!(value, json!({"error": "not available"}));
    }

    #[test]
    fn test_feature_snapshot_coordinates_need_both() {
        let mut snapshot: FeatureSnapshot = serde_json::from_value(json!({
            "city": "London", "country": "GB", "lat": 51.5, "lon": -0.12,
            "features": {"temp_mean_tomorrow": 14.2, "dayofyear_tomorrow": 123.0}
        }))
        .unwrap();
        assert_eq!(snapshot.coordinates(), Some(Coordinates::new(51.5, -0.12)));
        assert_eq!(snapshot.features.temp_mean_tomorrow, Some(14.2));
        assert_eq!(snapshot.features.humidity_mean_tomorrow, None);

        snapshot.lon = None;
        assert_eq!(snapshot.coordinates(), None);
    }

    #[test]
    fn test_model_evaluation_mixed_results() {
        let eval: ModelEvaluation = serde_json::from_value(json!({
            "results": {
                "rule": {"MAE": 1.5, "RMSE": 2.25},
                "xgboost": {"error": "model not found"}
            },
            "best": "rule",
            "best_mae": 1.5
        }))
        .unwrap();

        assert_eq!(
            eval.results.get("rule"),
            Some(&ModelScore::Metrics { mae: 1.5, rmse: 2.25 })
        );
        assert!(matches!(eval.results.get("xgboost"), Some(ModelScore::Failed { .. })));
        assert_eq!(eval.best.as_deref(), Some("rule"));
    }
}
