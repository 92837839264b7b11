//! One-shot "where am I" lookup that seeds the selected city.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use laundry_core::{AppError, LocationError};
use laundry_weather::{LocationProvider, PlaceResolver};
use tokio::sync::watch;

use crate::error_mapping::location_error;
use crate::models::city_selection::{CitySelection, SelectionSource};

pub const DETECTING_STATUS: &str = "Detecting your location…";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoOutcome {
    /// The selection now holds this place name.
    Resolved(String),
    /// No location capability on this device.
    Unavailable,
    /// Position or place lookup failed. Front-ends stay silent about it.
    Failed { reason: String, hint: &'static str },
    /// A previous call already ran the lookup.
    AlreadyAttempted,
}

pub struct GeoResolver {
    location: Arc<dyn LocationProvider>,
    places: Arc<dyn PlaceResolver>,
    attempted: AtomicBool,
    status: watch::Sender<Option<&'static str>>,
}

impl GeoResolver {
    pub fn new(location: Arc<dyn LocationProvider>, places: Arc<dyn PlaceResolver>) -> Self {
        let (status, _) = watch::channel(None);
        Self {
            location,
            places,
            attempted: AtomicBool::new(false),
            status,
        }
    }

    /// The transient status line, set only while a lookup is in flight.
    pub fn status(&self) -> Option<&'static str> {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Option<&'static str>> {
        self.status.subscribe()
    }

    /// Look up the device position and replace the selected city with the
    /// place name found there.
    ///
    /// Failures leave the selection untouched. Only the first call does
    /// anything; later calls return [`GeoOutcome::AlreadyAttempted`].
    pub async fn detect(&self, selection: &CitySelection) -> GeoOutcome {
        if self.attempted.swap(true, Ordering::SeqCst) {
            return GeoOutcome::AlreadyAttempted;
        }

        if !self.location.is_available() {
            tracing::debug!("No location capability, keeping {:?}", selection.city());
            return GeoOutcome::Unavailable;
        }

        self.status.send_replace(Some(DETECTING_STATUS));
        let outcome = self.lookup().await;
        self.status.send_replace(None);

        match outcome {
            Ok(place) => {
                tracing::info!("Detected location: {}", place);
                selection.set_city(&place, SelectionSource::Geolocation);
                GeoOutcome::Resolved(place)
            }
            Err(e) => {
                tracing::debug!("Location lookup failed: {}", e);
                GeoOutcome::Failed {
                    reason: e.to_string(),
                    hint: e.user_message(),
                }
            }
        }
    }

    async fn lookup(&self) -> Result<String, AppError> {
        let position = self
            .location
            .current_position()
            .await
            .map_err(location_error)?;

        self.places
            .resolve_place(position)
            .await
            .ok_or(AppError::Location(LocationError::NotResolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use laundry_weather::{Coordinates, FixedLocation, LocationError as DeviceError, NoLocation};

    struct DeniedLocation;

    #[async_trait]
    impl LocationProvider for DeniedLocation {
        fn is_available(&self) -> bool {
            true
        }

        async fn current_position(&self) -> Result<Coordinates, DeviceError> {
            Err(DeviceError::PermissionDenied)
        }
    }

    #[derive(Default)]
    struct FakePlaces {
        place: Option<String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakePlaces {
        fn named(place: &str) -> Self {
            Self {
                place: Some(place.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PlaceResolver for FakePlaces {
        async fn resolve_place(&self, _coordinates: Coordinates) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.place.clone()
        }
    }

    fn here() -> Arc<FixedLocation> {
        Arc::new(FixedLocation(Coordinates::new(52.52, 13.40)))
    }

    #[tokio::test]
    async fn test_resolved_place_replaces_city() {
        let places = Arc::new(FakePlaces::named("Berlin"));
        let resolver = GeoResolver::new(here(), places.clone());
        let selection = CitySelection::new("London");

        let outcome = resolver.detect(&selection).await;

        assert_eq!(outcome, GeoOutcome::Resolved("Berlin".into()));
        let current = selection.current();
        assert_eq!(current.city, "Berlin");
        assert_eq!(current.source, SelectionSource::Geolocation);
        assert_eq!(current.coordinates, None);
        assert_eq!(resolver.status(), None);
    }

    #[tokio::test]
    async fn test_permission_denied_keeps_city() {
        let places = Arc::new(FakePlaces::named("Berlin"));
        let resolver = GeoResolver::new(Arc::new(DeniedLocation), places.clone());
        let selection = CitySelection::new("London");

        let outcome = resolver.detect(&selection).await;

        assert_eq!(
            outcome,
            GeoOutcome::Failed {
                reason: "Location error: Location permission denied".into(),
                hint: "Location access was denied.",
            }
        );
        assert_eq!(selection.city(), "London");
        assert_eq!(selection.current().revision, 0);
        assert_eq!(resolver.status(), None);
        assert_eq!(places.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_capability_is_silent() {
        let resolver = GeoResolver::new(Arc::new(NoLocation), Arc::new(FakePlaces::named("Oslo")));
        let selection = CitySelection::new("London");
        let status = resolver.subscribe_status();

        assert_eq!(resolver.detect(&selection).await, GeoOutcome::Unavailable);
        assert_eq!(selection.city(), "London");
        assert!(!status.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_unnamed_place_keeps_city() {
        let resolver = GeoResolver::new(here(), Arc::new(FakePlaces::default()));
        let selection = CitySelection::new("London");

        assert!(matches!(
            resolver.detect(&selection).await,
            GeoOutcome::Failed { hint, .. } if hint.contains("which city")
        ));
        assert_eq!(selection.city(), "London");
    }

    #[tokio::test]
    async fn test_runs_only_once() {
        let places = Arc::new(FakePlaces::named("Berlin"));
        let resolver = GeoResolver::new(here(), places.clone());
        let selection = CitySelection::new("London");

        resolver.detect(&selection).await;
        selection.set_city("Paris", SelectionSource::Form);

        assert_eq!(resolver.detect(&selection).await, GeoOutcome::AlreadyAttempted);
        assert_eq!(selection.city(), "Paris");
        assert_eq!(places.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_shown_while_detecting() {
        let places = Arc::new(FakePlaces {
            place: Some("Vienna".into()),
            delay: Duration::from_millis(500),
            ..Default::default()
        });
        let resolver = GeoResolver::new(here(), places);
        let selection = CitySelection::new("London");

        let (outcome, during) = tokio::join!(resolver.detect(&selection), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            resolver.status()
        });

        assert_eq!(during, Some(DETECTING_STATUS));
        assert_eq!(outcome, GeoOutcome::Resolved("Vienna".into()));
        assert_eq!(resolver.status(), None);
    }
}
