//! Search coordination: local matches first, then one geocoding call.
//!
//! A search is split into three steps so the geocoding call can run
//! without holding the store:
//!
//! 1. [`SearchCoordinator::begin`] validates the query and tries the
//!    store. Anything that needs the provider becomes a [`PendingSearch`]
//!    with a fresh ticket.
//! 2. [`PendingSearch::run`] talks to the [`Geocoder`] under a timeout.
//! 3. [`SearchCoordinator::complete`] applies the reply, unless a newer
//!    search has been started since, in which case it is dropped.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::Result;
use crate::geocoding::{Candidate, GeocodeRequest, Geocoder};
use crate::models::{Location, LocationId, MapViewport};
use crate::store::LocationStore;

/// What a submitted search ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank query, nothing done
    Ignored,
    /// A location already in the store matched and was selected
    SelectedExisting(LocationId),
    /// A geocoded place was added and selected
    Added(LocationId),
    /// The provider returned nothing usable
    NoResult,
    /// The provider call failed
    ProviderFailed,
    /// The provider did not answer in time
    TimedOut,
    /// A newer search was started before this reply arrived
    Superseded,
}

impl SearchOutcome {
    /// Whether the search field should be emptied
    #[must_use]
    pub fn clears_search_text(&self) -> bool {
        matches!(
            self,
            SearchOutcome::SelectedExisting(_) | SearchOutcome::Added(_)
        )
    }
}

/// Result of [`SearchCoordinator::begin`]
#[derive(Debug)]
pub enum SearchStep {
    Idle,
    Resolved(LocationId),
    Pending(PendingSearch),
}

/// Why a geocoding call produced no candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyFailure {
    Provider(String),
    TimedOut,
}

/// Provider answer tagged with the ticket of the search that asked
#[derive(Debug, Clone)]
pub struct GeocodeReply {
    pub ticket: u64,
    pub query: String,
    pub result: std::result::Result<Vec<Candidate>, ReplyFailure>,
}

/// A geocoding call waiting to be made
#[derive(Debug, Clone)]
pub struct PendingSearch {
    ticket: u64,
    request: GeocodeRequest,
}

impl PendingSearch {
    #[must_use]
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    #[must_use]
    pub fn request(&self) -> &GeocodeRequest {
        &self.request
    }

    /// Ask the provider, giving up after `timeout`
    pub async fn run<G>(self, geocoder: &G, timeout: Duration) -> GeocodeReply
    where
        G: Geocoder + ?Sized,
    {
        debug!("Geocoding '{}' (ticket {})", self.request.query, self.ticket);
        let result = match tokio::time::timeout(timeout, geocoder.search(&self.request)).await {
            Ok(Ok(candidates)) => Ok(candidates),
            Ok(Err(e)) => Err(ReplyFailure::Provider(e.to_string())),
            Err(_) => Err(ReplyFailure::TimedOut),
        };
        GeocodeReply {
            ticket: self.ticket,
            query: self.request.query,
            result,
        }
    }
}

/// Resolves search text against the store or the geocoding provider
#[derive(Debug, Default)]
pub struct SearchCoordinator {
    latest_ticket: u64,
}

impl SearchCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket of the most recently started search
    #[must_use]
    pub fn latest_ticket(&self) -> u64 {
        self.latest_ticket
    }

    /// Start a search for `query_text`.
    ///
    /// A store entry whose name contains the query (ignoring case) is
    /// selected directly and no provider call is made. Either way any
    /// outstanding provider call is superseded.
    pub fn begin(
        &mut self,
        query_text: &str,
        store: &mut LocationStore,
        bias_region: Option<MapViewport>,
    ) -> SearchStep {
        let query = query_text.trim();
        if query.is_empty() {
            return SearchStep::Idle;
        }

        self.latest_ticket += 1;

        if let Some(id) = store.find_by_name(query).map(Location::id) {
            info!("'{}' matches an existing location, selecting it", query);
            store.select([id]);
            return SearchStep::Resolved(id);
        }

        SearchStep::Pending(PendingSearch {
            ticket: self.latest_ticket,
            request: GeocodeRequest {
                query: query.to_string(),
                bias_region,
            },
        })
    }

    /// Apply a provider reply to the store.
    ///
    /// Only the first candidate is considered, and only when it has a
    /// name, a region label and a valid coordinate.
    ///
    /// # Errors
    /// `DuplicateIdentifier` if the store rejects the new location.
    pub fn complete(
        &mut self,
        reply: GeocodeReply,
        store: &mut LocationStore,
    ) -> Result<SearchOutcome> {
        if reply.ticket != self.latest_ticket {
            debug!(
                "Dropping stale reply for '{}' (ticket {}, latest {})",
                reply.query, reply.ticket, self.latest_ticket
            );
            return Ok(SearchOutcome::Superseded);
        }

        let candidates = match reply.result {
            Ok(candidates) => candidates,
            Err(ReplyFailure::Provider(message)) => {
                warn!("Geocoding '{}' failed: {}", reply.query, message);
                return Ok(SearchOutcome::ProviderFailed);
            }
            Err(ReplyFailure::TimedOut) => {
                warn!("Geocoding '{}' timed out", reply.query);
                return Ok(SearchOutcome::TimedOut);
            }
        };

        let Some(location) = candidates.into_iter().next().and_then(candidate_to_location) else {
            debug!("No usable candidate for '{}'", reply.query);
            return Ok(SearchOutcome::NoResult);
        };

        let id = location.id();
        info!(
            "Adding '{}' ({}) at {}",
            location.name,
            location.country,
            location.format_coordinates()
        );
        store.add(location)?;
        Ok(SearchOutcome::Added(id))
    }
}

fn candidate_to_location(candidate: Candidate) -> Option<Location> {
    let name = candidate.name.filter(|name| !name.trim().is_empty())?;
    let region = candidate
        .region_label
        .filter(|label| !label.trim().is_empty())?;
    let coordinate = candidate.coordinate.filter(|c| c.is_valid())?;
    Some(Location::new(name, region, coordinate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use crate::{PlaceMapError, Result};
    use async_trait::async_trait;

    struct FixedGeocoder(Vec<Candidate>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn search(&self, _request: &GeocodeRequest) -> Result<Vec<Candidate>> {
            Ok(self.0.clone())
        }
    }

    struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn search(&self, _request: &GeocodeRequest) -> Result<Vec<Candidate>> {
            Err(PlaceMapError::geocoding("connection refused"))
        }
    }

    struct SlowGeocoder;

    #[async_trait]
    impl Geocoder for SlowGeocoder {
        async fn search(&self, _request: &GeocodeRequest) -> Result<Vec<Candidate>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![Candidate::new("Late", "Nowhere", 0.0, 0.0)])
        }
    }

    fn pending(step: SearchStep) -> PendingSearch {
        match step {
            SearchStep::Pending(pending) => pending,
            other => panic!("expected a pending search, got {other:?}"),
        }
    }

    fn reply(ticket: u64, candidates: Vec<Candidate>) -> GeocodeReply {
        GeocodeReply {
            ticket,
            query: "q".to_string(),
            result: Ok(candidates),
        }
    }

    #[test]
    fn test_blank_query_is_idle() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        assert!(matches!(coordinator.begin("   ", &mut store, None), SearchStep::Idle));
        assert_eq!(coordinator.latest_ticket(), 0);
    }

    #[test]
    fn test_local_match_selects_without_provider() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        let paris = Location::new(
            "Paris".to_string(),
            "France".to_string(),
            Coordinate::new(48.85, 2.35),
        );
        let paris_id = paris.id();
        store.add(paris).unwrap();
        store
            .add(Location::new(
                "Rome".to_string(),
                "Italy".to_string(),
                Coordinate::new(41.9, 12.5),
            ))
            .unwrap();

        let step = coordinator.begin(" paris ", &mut store, None);
        assert!(matches!(step, SearchStep::Resolved(id) if id == paris_id));
        assert_eq!(store.selected_ids(), vec![paris_id]);
    }

    #[test]
    fn test_pending_request_carries_trimmed_query_and_bias() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        let bias = crate::config::MapConfig::default().initial_viewport();

        let pending = pending(coordinator.begin("  Oslo ", &mut store, Some(bias)));
        assert_eq!(pending.ticket(), 1);
        assert_eq!(pending.request().query, "Oslo");
        assert_eq!(pending.request().bias_region, Some(bias));
    }

    #[test]
    fn test_first_candidate_is_added() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        let ticket = pending(coordinator.begin("paris", &mut store, None)).ticket();

        let outcome = coordinator
            .complete(
                reply(
                    ticket,
                    vec![
                        Candidate::new("Paris", "France", 48.85, 2.35),
                        Candidate::new("Paris", "Texas", 33.66, -95.55),
                    ],
                ),
                &mut store,
            )
            .unwrap();

        let SearchOutcome::Added(id) = outcome else {
            panic!("expected Added, got {outcome:?}");
        };
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().country, "France");
        assert_eq!(store.selected_ids(), vec![id]);
    }

    #[test]
    fn test_incomplete_first_candidate_is_dropped() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        let ticket = pending(coordinator.begin("x", &mut store, None)).ticket();

        let mut no_region = Candidate::new("Paris", "France", 48.85, 2.35);
        no_region.region_label = None;
        let outcome = coordinator
            .complete(
                reply(ticket, vec![no_region, Candidate::new("Lyon", "France", 45.76, 4.83)]),
                &mut store,
            )
            .unwrap();

        assert_eq!(outcome, SearchOutcome::NoResult);
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_reply_is_no_result() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        let ticket = pending(coordinator.begin("x", &mut store, None)).ticket();
        let outcome = coordinator.complete(reply(ticket, vec![]), &mut store).unwrap();
        assert_eq!(outcome, SearchOutcome::NoResult);
        assert!(!outcome.clears_search_text());
    }

    #[test]
    fn test_stale_reply_is_superseded() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        let first = pending(coordinator.begin("paris", &mut store, None)).ticket();
        let second = pending(coordinator.begin("rome", &mut store, None)).ticket();
        assert!(second > first);

        let outcome = coordinator
            .complete(
                reply(first, vec![Candidate::new("Paris", "France", 48.85, 2.35)]),
                &mut store,
            )
            .unwrap();
        assert_eq!(outcome, SearchOutcome::Superseded);
        assert!(store.is_empty());
    }

    #[test]
    fn test_local_match_supersedes_outstanding_call() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        store
            .add(Location::new(
                "Rome".to_string(),
                "Italy".to_string(),
                Coordinate::new(41.9, 12.5),
            ))
            .unwrap();

        let outstanding = pending(coordinator.begin("paris", &mut store, None)).ticket();
        assert!(matches!(
            coordinator.begin("rome", &mut store, None),
            SearchStep::Resolved(_)
        ));

        let outcome = coordinator
            .complete(
                reply(outstanding, vec![Candidate::new("Paris", "France", 48.85, 2.35)]),
                &mut store,
            )
            .unwrap();
        assert_eq!(outcome, SearchOutcome::Superseded);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_run_collects_candidates() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();
        let geocoder = FixedGeocoder(vec![Candidate::new("Oslo", "Norway", 59.91, 10.75)]);

        let search = pending(coordinator.begin("oslo", &mut store, None));
        let reply = search.run(&geocoder, Duration::from_secs(1)).await;
        assert_eq!(reply.ticket, 1);
        assert_eq!(reply.result.as_ref().unwrap().len(), 1);

        let outcome = coordinator.complete(reply, &mut store).unwrap();
        assert!(matches!(outcome, SearchOutcome::Added(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported_not_raised() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();

        let search = pending(coordinator.begin("oslo", &mut store, None));
        let reply = search.run(&FailingGeocoder, Duration::from_secs(1)).await;
        let outcome = coordinator.complete(reply, &mut store).unwrap();
        assert_eq!(outcome, SearchOutcome::ProviderFailed);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let mut coordinator = SearchCoordinator::new();
        let mut store = LocationStore::new();

        let search = pending(coordinator.begin("oslo", &mut store, None));
        let reply = search.run(&SlowGeocoder, Duration::from_secs(5)).await;
        assert_eq!(reply.result, Err(ReplyFailure::TimedOut));

        let outcome = coordinator.complete(reply, &mut store).unwrap();
        assert_eq!(outcome, SearchOutcome::TimedOut);
    }
}
