//! Prediction orchestrator.
//!
//! A run fans out the rule, Prophet, XGBoost and feature calls at once and
//! merges whatever comes back into one [`ResultSnapshot`]. Runs are numbered;
//! a run that finishes after a newer one has started is discarded whole.

use std::sync::Arc;

use chrono::Utc;
use laundry_weather::{
    ApiError, CityRequest, Coordinates, FeatureSnapshot, ModelPrediction, PredictionBackend,
    PredictionResult, ResultSnapshot,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error_mapping::api_error;
use crate::models::city_selection::Selection;

/// Why the latest run produced no result.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    /// Technical message from the failed rule call
    pub message: String,
    /// Short text for display next to the message
    pub hint: &'static str,
}

impl RunFailure {
    fn from_api_error(e: ApiError) -> Self {
        let e = api_error(e);
        Self {
            message: e.to_string(),
            hint: e.user_message(),
        }
    }
}

/// Everything a front-end needs to draw the results area.
///
/// `error` and `snapshot` are independent: a failed run leaves the previous
/// snapshot in place.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorState {
    pub snapshot: Option<Arc<ResultSnapshot>>,
    pub features: Option<Arc<FeatureSnapshot>>,
    /// Coordinates reused by later runs when the caller has none
    pub coordinates: Option<Coordinates>,
    pub loading: bool,
    pub error: Option<RunFailure>,
    /// Number of the most recently started run
    pub latest_run: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Published(Arc<ResultSnapshot>),
    Failed(RunFailure),
    /// A newer run started before this one finished.
    Superseded,
    /// Blank city; nothing was sent.
    Rejected,
}

pub struct PredictionOrchestrator {
    backend: Arc<dyn PredictionBackend>,
    state: Mutex<OrchestratorState>,
    updates: watch::Sender<OrchestratorState>,
}

impl PredictionOrchestrator {
    pub fn new(backend: Arc<dyn PredictionBackend>) -> Self {
        let (updates, _) = watch::channel(OrchestratorState::default());
        Self {
            backend,
            state: Mutex::new(OrchestratorState::default()),
            updates,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.updates.subscribe()
    }

    pub async fn run(&self, city: &str) -> RunOutcome {
        self.run_with(city, None).await
    }

    /// Run all predictions for `city`.
    ///
    /// Coordinates are taken from `coordinates`, else the ones remembered
    /// from earlier runs, else the last feature snapshot.
    pub async fn run_with(&self, city: &str, coordinates: Option<Coordinates>) -> RunOutcome {
        let city = city.trim();
        if city.is_empty() {
            tracing::debug!("Ignoring prediction request without a city");
            return RunOutcome::Rejected;
        }

        let (run, coordinates) = {
            let mut state = self.state.lock();
            state.latest_run += 1;
            state.loading = true;
            state.error = None;
            let coordinates = coordinates.or(state.coordinates).or_else(|| {
                state
                    .features
                    .as_ref()
                    .and_then(|features| features.coordinates())
            });
            self.updates.send_replace(state.clone());
            (state.latest_run, coordinates)
        };

        tracing::debug!(run, city, ?coordinates, "Starting prediction run");
        let request = CityRequest::new(city, coordinates);
        let (rule, prophet, xgb, features) = tokio::join!(
            self.backend.predict_rule(&request),
            self.backend.predict_prophet(&request),
            self.backend.predict_xgboost(&request),
            self.backend.fetch_features(&request),
        );

        let mut state = self.state.lock();
        if state.latest_run != run {
            tracing::debug!(
                "Discarding run {} for {:?}, run {} is newer",
                run,
                city,
                state.latest_run
            );
            return RunOutcome::Superseded;
        }
        state.loading = false;

        let rule = match rule {
            Ok(rule) => rule,
            Err(e) => {
                tracing::warn!("Rule prediction for {:?} failed: {}", city, e);
                let failure = RunFailure::from_api_error(e);
                state.error = Some(failure.clone());
                self.updates.send_replace(state.clone());
                return RunOutcome::Failed(failure);
            }
        };

        match features {
            Ok(features) => {
                if let Some(coordinates) = features.coordinates() {
                    state.coordinates = Some(coordinates);
                }
                state.features = Some(Arc::new(features));
            }
            Err(e) => tracing::warn!("Feature fetch for {:?} failed: {}", city, e),
        }

        let snapshot = Arc::new(ResultSnapshot {
            run,
            city: city.to_string(),
            rule,
            prophet: model_slot("Prophet", city, prophet),
            xgb: model_slot("XGBoost", city, xgb),
            fetched_at: Utc::now(),
        });
        state.snapshot = Some(Arc::clone(&snapshot));
        self.updates.send_replace(state.clone());

        tracing::info!(
            "Published run {} for {}: safe_to_dry_outside={}",
            run,
            city,
            snapshot.rule.safe_to_dry_outside
        );
        RunOutcome::Published(snapshot)
    }

    /// Start a run for every city-name change seen on `selection`,
    /// beginning with the current one.
    ///
    /// Coordinate-only changes are ignored. The task ends when the selection
    /// is dropped.
    pub fn drive(self: &Arc<Self>, mut selection: watch::Receiver<Selection>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let mut last_revision = None;
            loop {
                let current = selection.borrow_and_update().clone();
                if last_revision != Some(current.revision) {
                    last_revision = Some(current.revision);
                    let orchestrator = Arc::clone(&orchestrator);
                    tokio::spawn(async move {
                        orchestrator
                            .run_with(&current.city, current.coordinates)
                            .await;
                    });
                }

                if selection.changed().await.is_err() {
                    tracing::debug!("City selection closed, stopping prediction driver");
                    break;
                }
            }
        })
    }
}

fn model_slot(
    model: &str,
    city: &str,
    result: Result<ModelPrediction, ApiError>,
) -> PredictionResult {
    match result {
        Ok(prediction) => PredictionResult::Available(prediction),
        Err(e) => {
            tracing::warn!("{} prediction for {:?} unavailable: {}", model, city, e);
            PredictionResult::not_available()
        }
    }
}
