//! The current city, shared by the search box, the city form and the
//! location lookup.
//!
//! Writers go through the setters; readers either poll `current()` or
//! subscribe to the watch channel. Only city-name changes bump `revision`.

use laundry_weather::Coordinates;
use tokio::sync::watch;

/// Which input last set the city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionSource {
    #[default]
    Default,
    Form,
    Autocomplete,
    Geolocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub city: String,
    pub coordinates: Option<Coordinates>,
    pub source: SelectionSource,
    /// Incremented on every city-name change
    pub revision: u64,
}

#[derive(Debug)]
pub struct CitySelection {
    tx: watch::Sender<Selection>,
}

impl CitySelection {
    pub fn new(default_city: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(Selection {
            city: default_city.into().trim().to_string(),
            coordinates: None,
            source: SelectionSource::Default,
            revision: 0,
        });
        Self { tx }
    }

    pub fn current(&self) -> Selection {
        self.tx.borrow().clone()
    }

    pub fn city(&self) -> String {
        self.tx.borrow().city.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.tx.subscribe()
    }

    /// Replace the city name and drop any coordinates of the previous city.
    ///
    /// Returns false for blank names and for the name already selected.
    pub fn set_city(&self, city: &str, source: SelectionSource) -> bool {
        self.update(city, None, source)
    }

    /// Replace the city name together with known coordinates, as an
    /// autocomplete pick does.
    pub fn set_city_with_coordinates(
        &self,
        city: &str,
        coordinates: Coordinates,
        source: SelectionSource,
    ) -> bool {
        self.update(city, Some(coordinates), source)
    }

    fn update(
        &self,
        city: &str,
        coordinates: Option<Coordinates>,
        source: SelectionSource,
    ) -> bool {
        let city = city.trim();
        if city.is_empty() {
            tracing::debug!("Ignoring blank city from {:?}", source);
            return false;
        }

        self.tx.send_if_modified(|selection| {
            if selection.city == city {
                return false;
            }
            tracing::info!("City changed to {:?} ({:?})", city, source);
            selection.city = city.to_string();
            selection.coordinates = coordinates;
            selection.source = source;
            selection.revision += 1;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selection() {
        let selection = CitySelection::new("London");
        let current = selection.current();
        assert_eq!(current.city, "London");
        assert_eq!(current.source, SelectionSource::Default);
        assert_eq!(current.revision, 0);
        assert_eq!(current.coordinates, None);
    }

    #[test]
    fn test_set_city_bumps_revision() {
        let selection = CitySelection::new("London");
        assert!(selection.set_city("  Paris ", SelectionSource::Form));

        let current = selection.current();
        assert_eq!(current.city, "Paris");
        assert_eq!(current.source, SelectionSource::Form);
        assert_eq!(current.revision, 1);
    }

    #[test]
    fn test_same_or_blank_city_is_not_a_change() {
        let selection = CitySelection::new("London");
        assert!(!selection.set_city("London", SelectionSource::Autocomplete));
        assert!(!selection.set_city("   ", SelectionSource::Form));
        assert_eq!(selection.current().revision, 0);
        assert_eq!(selection.current().source, SelectionSource::Default);
    }

    #[test]
    fn test_new_city_drops_old_coordinates() {
        let selection = CitySelection::new("London");
        selection.set_city_with_coordinates(
            "Leeds",
            Coordinates::new(53.8, -1.55),
            SelectionSource::Autocomplete,
        );
        assert_eq!(selection.current().coordinates, Some(Coordinates::new(53.8, -1.55)));

        selection.set_city("York", SelectionSource::Geolocation);
        assert_eq!(selection.current().coordinates, None);
    }

    #[tokio::test]
    async fn test_same_city_with_coordinates_is_not_a_change() {
        let selection = CitySelection::new("London");
        let rx = selection.subscribe();

        assert!(!selection.set_city_with_coordinates(
            "London",
            Coordinates::new(51.5, -0.12),
            SelectionSource::Autocomplete,
        ));

        assert!(!rx.has_changed().unwrap());
        assert_eq!(selection.current().coordinates, None);
        assert_eq!(selection.current().revision, 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_city_changes() {
        let selection = CitySelection::new("London");
        let mut rx = selection.subscribe();
        rx.borrow_and_update();

        selection.set_city("Madrid", SelectionSource::Form);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().city, "Madrid");
    }
}
