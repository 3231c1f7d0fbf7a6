//! Application state for one browsing session.
//!
//! `MapSession` owns the location store, the search coordinator and the
//! persisted search text, and is the surface the presentation layer
//! drives. Every mutation recomputes the viewport from the selection and
//! publishes it on a watch channel; animating towards it is up to the
//! subscriber.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::config::PlaceMapConfig;
use crate::geocoding::{Geocoder, OpenMeteoGeocoder};
use crate::models::{Location, LocationId, MapViewport};
use crate::preferences::{FjallPreferences, PreferenceStore, SEARCH_TEXT_KEY};
use crate::search::{GeocodeReply, SearchCoordinator, SearchOutcome, SearchStep};
use crate::store::{LocationStore, StoreEvent};
use crate::viewport::ViewportCalculator;

/// Upper bound for one geocoding call when none is configured
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MapSession {
    store: LocationStore,
    search: SearchCoordinator,
    calculator: ViewportCalculator,
    viewport: watch::Sender<MapViewport>,
    geocoder: Arc<dyn Geocoder>,
    search_timeout: Duration,
    search_text: String,
    preferences: Box<dyn PreferenceStore>,
}

impl MapSession {
    /// Start an empty session at `initial_viewport`, restoring the saved
    /// search text from `preferences`.
    pub async fn new(
        initial_viewport: MapViewport,
        geocoder: Arc<dyn Geocoder>,
        preferences: Box<dyn PreferenceStore>,
    ) -> Self {
        let search_text = match preferences.get_string(SEARCH_TEXT_KEY).await {
            Ok(text) => text.unwrap_or_default(),
            Err(e) => {
                warn!("Could not restore search text: {}", e);
                String::new()
            }
        };
        let (viewport, _) = watch::channel(initial_viewport);

        Self {
            store: LocationStore::new(),
            search: SearchCoordinator::new(),
            calculator: ViewportCalculator::default(),
            viewport,
            geocoder,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            search_text,
            preferences,
        }
    }

    /// Session using the map and geocoding settings from `config`
    pub async fn from_config(
        config: &PlaceMapConfig,
        geocoder: Arc<dyn Geocoder>,
        preferences: Box<dyn PreferenceStore>,
    ) -> Self {
        Self::new(config.map.initial_viewport(), geocoder, preferences)
            .await
            .with_calculator(ViewportCalculator::from_config(&config.map))
            .with_search_timeout(config.geocoding.timeout())
    }

    /// Session backed by the Open-Meteo client and the on-disk preference
    /// database named in `config`.
    ///
    /// # Errors
    /// The HTTP client could not be built or the preference database could
    /// not be opened.
    pub async fn open(config: &PlaceMapConfig) -> Result<Self> {
        let geocoder = OpenMeteoGeocoder::new(&config.geocoding)?;
        let preferences = FjallPreferences::from_config(&config.preferences)?;
        info!("Opening session, preferences at {}", config.preferences.path);
        Ok(Self::from_config(config, Arc::new(geocoder), Box::new(preferences)).await)
    }

    #[must_use]
    pub fn with_calculator(mut self, calculator: ViewportCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    #[must_use]
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        self.store.locations()
    }

    /// Selected identifiers in list order
    #[must_use]
    pub fn selection(&self) -> Vec<LocationId> {
        self.store.selected_ids()
    }

    #[must_use]
    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    #[must_use]
    pub fn viewport(&self) -> MapViewport {
        *self.viewport.borrow()
    }

    pub fn subscribe_viewport(&self) -> watch::Receiver<MapViewport> {
        self.viewport.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    #[must_use]
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    #[must_use]
    pub fn geocoder(&self) -> Arc<dyn Geocoder> {
        Arc::clone(&self.geocoder)
    }

    #[must_use]
    pub fn search_timeout(&self) -> Duration {
        self.search_timeout
    }

    #[must_use]
    pub fn preferences(&self) -> &dyn PreferenceStore {
        self.preferences.as_ref()
    }

    /// Update the search field contents and persist them
    pub async fn set_search_text(&mut self, text: &str) {
        if self.search_text == text {
            return;
        }
        self.search_text = text.to_string();
        if let Err(e) = self.preferences.set_string(SEARCH_TEXT_KEY, text).await {
            warn!("Could not save search text: {}", e);
        }
    }

    /// Submit `text` and wait for the search to finish.
    ///
    /// # Errors
    /// Only the fatal `DuplicateIdentifier`; every other failure is an
    /// outcome.
    pub async fn submit_search(&mut self, text: &str) -> Result<SearchOutcome> {
        match self.begin_search(text).await {
            SearchStep::Idle => Ok(SearchOutcome::Ignored),
            SearchStep::Resolved(id) => Ok(SearchOutcome::SelectedExisting(id)),
            SearchStep::Pending(pending) => {
                let geocoder = self.geocoder();
                let reply = pending.run(geocoder.as_ref(), self.search_timeout).await;
                self.complete_search(reply).await
            }
        }
    }

    /// First half of a search. Local matches are applied immediately; a
    /// `Pending` step must be run and handed to [`Self::complete_search`].
    /// Blank text is ignored and leaves the saved search text alone.
    pub async fn begin_search(&mut self, text: &str) -> SearchStep {
        if text.trim().is_empty() {
            return SearchStep::Idle;
        }
        self.set_search_text(text).await;
        let bias = Some(self.viewport());
        let step = self.search.begin(text, &mut self.store, bias);
        if matches!(step, SearchStep::Resolved(_)) {
            self.set_search_text("").await;
            self.refresh_viewport();
        }
        step
    }

    /// Apply a geocoding reply produced by a `Pending` step.
    ///
    /// # Errors
    /// Only the fatal `DuplicateIdentifier`.
    pub async fn complete_search(&mut self, reply: GeocodeReply) -> Result<SearchOutcome> {
        let outcome = self.search.complete(reply, &mut self.store).inspect_err(|e| {
            error!("Search result could not be stored: {}", e);
        })?;
        if outcome.clears_search_text() {
            self.set_search_text("").await;
            self.refresh_viewport();
        }
        debug!("Search finished: {:?}", outcome);
        Ok(outcome)
    }

    /// Replace the selection; unknown identifiers are ignored
    pub fn select_locations<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = LocationId>,
    {
        self.store.select(ids);
        self.refresh_viewport();
    }

    /// Remove one location; unknown identifiers are ignored
    pub fn delete_location(&mut self, id: LocationId) -> Option<Location> {
        let removed = self.store.remove(id);
        self.refresh_viewport();
        removed
    }

    /// Remove every selected location
    pub fn delete_selected(&mut self) -> Vec<Location> {
        let removed: Vec<Location> = self
            .store
            .selected_ids()
            .into_iter()
            .filter_map(|id| self.store.remove(id))
            .collect();
        self.refresh_viewport();
        removed
    }

    fn refresh_viewport(&mut self) {
        let next = self
            .calculator
            .compute_viewport(self.store.selected_locations(), self.viewport());
        self.viewport.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
