//! Debounced city autocomplete.
//!
//! Each keystroke restarts a quiet-period timer; only when the timer runs
//! out is the search sent. Results for anything but the latest input are
//! dropped on arrival.

use std::sync::Arc;
use std::time::Duration;

use laundry_weather::{City, CityIndex};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::city_selection::{CitySelection, SelectionSource};

/// What the search box shows: the input text and the candidate list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub candidates: Vec<City>,
}

#[derive(Debug, Default)]
struct SearchInner {
    state: SearchState,
    /// Bumped on every input or pick; in-flight results carry the value they started with
    generation: u64,
}

pub struct CitySearch {
    index: Arc<dyn CityIndex>,
    debounce: Duration,
    min_query_len: usize,
    inner: Arc<Mutex<SearchInner>>,
    updates: Arc<watch::Sender<SearchState>>,
    pending: Mutex<Option<CancellationToken>>,
}

impl CitySearch {
    pub fn new(index: Arc<dyn CityIndex>, debounce: Duration, min_query_len: usize) -> Self {
        let (tx, _) = watch::channel(SearchState::default());
        Self {
            index,
            debounce,
            min_query_len,
            inner: Arc::new(Mutex::new(SearchInner::default())),
            updates: Arc::new(tx),
            pending: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SearchState {
        self.inner.lock().state.clone()
    }

    pub fn candidates(&self) -> Vec<City> {
        self.inner.lock().state.candidates.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.updates.subscribe()
    }

    /// Handle new text in the search box.
    ///
    /// Must be called from within a tokio runtime; the debounced request
    /// runs on a spawned task.
    pub fn on_input(&self, text: &str) {
        self.cancel_pending();

        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.state.query = text.to_string();

            if text.chars().count() < self.min_query_len {
                inner.state.candidates.clear();
                self.updates.send_replace(inner.state.clone());
                return;
            }

            self.updates.send_replace(inner.state.clone());
            inner.generation
        };

        let token = CancellationToken::new();
        *self.pending.lock() = Some(token.clone());

        let index = Arc::clone(&self.index);
        let inner = Arc::clone(&self.inner);
        let updates = Arc::clone(&self.updates);
        let debounce = self.debounce;
        let query = text.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::trace!("Search for {:?} superseded before sending", query);
                    return;
                }
                _ = tokio::time::sleep(debounce) => {}
            }

            let result = index.search_city(&query).await;

            let mut inner = inner.lock();
            if inner.generation != generation {
                tracing::debug!("Discarding stale search results for {:?}", query);
                return;
            }

            match result {
                Ok(cities) => inner.state.candidates = cities,
                Err(e) => {
                    tracing::warn!("City search for {:?} failed: {}", query, e);
                    inner.state.candidates.clear();
                }
            }
            updates.send_replace(inner.state.clone());
        });
    }

    /// Pick a candidate: it becomes the selected city and the input text,
    /// and the list closes. Returns `None` if `index` is out of range.
    pub fn select(&self, index: usize, selection: &CitySelection) -> Option<City> {
        let city = {
            let mut inner = self.inner.lock();
            let city = inner.state.candidates.get(index).cloned()?;
            inner.generation += 1;
            inner.state.query = city.name.clone();
            inner.state.candidates.clear();
            self.updates.send_replace(inner.state.clone());
            city
        };
        self.cancel_pending();

        selection.set_city_with_coordinates(
            &city.name,
            city.coordinates(),
            SelectionSource::Autocomplete,
        );
        Some(city)
    }

    /// Cancel any search still waiting out its debounce window.
    pub fn shutdown(&self) {
        self.cancel_pending();
    }

    fn cancel_pending(&self) {
        if let Some(token) = self.pending.lock().take() {
            token.cancel();
        }
    }
}

impl Drop for CitySearch {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
