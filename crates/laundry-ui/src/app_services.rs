//! Application services for one planner session.
//!
//! `AppServices` owns the shared city selection and the three services that
//! read or write it: autocomplete, the location lookup and the prediction
//! orchestrator. Front-ends talk to this struct only.

use std::sync::Arc;

use laundry_core::{AppError, Config, SearchConfig};
use laundry_weather::{
    City, CityIndex, Coordinates, FixedLocation, LaundryApi, LocationProvider, NoLocation,
    NominatimGeocoder, PlaceResolver, PredictionBackend,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error_mapping::api_error;
use crate::models::city_selection::{CitySelection, SelectionSource};
use crate::services::{CitySearch, GeoOutcome, GeoResolver, OrchestratorState, PredictionOrchestrator};

pub struct AppServices {
    selection: Arc<CitySelection>,
    search: CitySearch,
    geo: GeoResolver,
    orchestrator: Arc<PredictionOrchestrator>,

    /// Task turning city changes into prediction runs, once started
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl AppServices {
    pub fn new(
        default_city: &str,
        search_config: &SearchConfig,
        backend: Arc<dyn PredictionBackend>,
        index: Arc<dyn CityIndex>,
        location: Arc<dyn LocationProvider>,
        places: Arc<dyn PlaceResolver>,
    ) -> Self {
        Self {
            selection: Arc::new(CitySelection::new(default_city)),
            search: CitySearch::new(
                index,
                search_config.debounce(),
                search_config.min_query_len,
            ),
            geo: GeoResolver::new(location, places),
            orchestrator: Arc::new(PredictionOrchestrator::new(backend)),
            driver: Mutex::new(None),
        }
    }

    /// Wire the HTTP clients described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let timeout = config.api.request_timeout();
        let api = Arc::new(LaundryApi::new(&config.api.base_url, timeout).map_err(api_error)?);
        let geocoder = NominatimGeocoder::new(
            &config.geocoder.base_url,
            &config.geocoder.user_agent,
            timeout,
        )
        .map_err(api_error)?;

        let location: Arc<dyn LocationProvider> = match config.location.position() {
            Some((lat, lon)) => Arc::new(FixedLocation(Coordinates::new(lat, lon))),
            None => Arc::new(NoLocation),
        };

        tracing::info!("Using prediction backend at {}", api.base_url());

        Ok(Self::new(
            &config.default_city,
            &config.search,
            api.clone(),
            api,
            location,
            Arc::new(geocoder),
        ))
    }

    pub fn selection(&self) -> &CitySelection {
        &self.selection
    }

    pub fn search(&self) -> &CitySearch {
        &self.search
    }

    pub fn geo(&self) -> &GeoResolver {
        &self.geo
    }

    pub fn orchestrator(&self) -> &Arc<PredictionOrchestrator> {
        &self.orchestrator
    }

    /// Start predicting: one run for the current city now, and one for every
    /// later city change. Calling it again does nothing.
    pub fn start(&self) {
        let mut driver = self.driver.lock();
        if driver.is_some() {
            return;
        }
        *driver = Some(self.orchestrator.drive(self.selection.subscribe()));
    }

    pub async fn detect_location(&self) -> GeoOutcome {
        self.geo.detect(&self.selection).await
    }

    /// City form submit. Returns false when nothing changed.
    pub fn submit_city(&self, city: &str) -> bool {
        self.selection.set_city(city, SelectionSource::Form)
    }

    pub fn pick_candidate(&self, index: usize) -> Option<City> {
        self.search.select(index, &self.selection)
    }

    /// Wait until a run numbered above `after` has concluded, then return
    /// the state it left behind.
    pub async fn wait_for_run_after(&self, after: u64) -> OrchestratorState {
        let mut updates = self.orchestrator.subscribe();
        let state = match updates
            .wait_for(|state| state.latest_run > after && !state.loading)
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => self.orchestrator.state(),
        };
        state
    }

    pub fn shutdown(&self) {
        tracing::info!("Shutting down planner services");
        self.search.shutdown();
        if let Some(driver) = self.driver.lock().take() {
            driver.abort();
        }
    }
}

impl Drop for AppServices {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_default_config() {
        let services = AppServices::from_config(&Config::default()).unwrap();
        assert_eq!(services.selection().city(), "London");
        assert!(services.search().candidates().is_empty());

        // location is off by default
        assert_eq!(services.detect_location().await, GeoOutcome::Unavailable);
    }

    #[test]
    fn test_bad_backend_url_is_config_error() {
        let mut config = Config::default();
        config.api.base_url = "not a url".into();

        let err = AppServices::from_config(&config).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_submit_city() {
        let services = AppServices::from_config(&Config::default()).unwrap();

        assert!(services.submit_city("Paris"));
        assert!(!services.submit_city("Paris"));
        assert!(!services.submit_city(""));
        assert_eq!(services.selection().current().source, SelectionSource::Form);
    }
}
