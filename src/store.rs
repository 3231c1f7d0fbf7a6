//! Ordered in-memory collection of locations and the current selection

use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::models::{Location, LocationId};
use crate::{PlaceMapError, Result};

const EVENT_CAPACITY: usize = 64;

/// Change notifications for observers of the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(LocationId),
    Removed(LocationId),
    /// New selection, in list order
    SelectionChanged(Vec<LocationId>),
}

/// Locations in display order plus the set of selected identifiers.
///
/// Every selected identifier refers to a location in `locations`.
/// Events are sent only after a mutation has fully completed.
#[derive(Debug)]
pub struct LocationStore {
    locations: Vec<Location>,
    selected: HashSet<LocationId>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for LocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationStore {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            locations: Vec::new(),
            selected: HashSet::new(),
            events,
        }
    }

    /// Receive future store events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|location| location.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: LocationId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn is_selected(&self, id: LocationId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected locations in list order
    pub fn selected_locations(&self) -> impl Iterator<Item = &Location> {
        self.locations
            .iter()
            .filter(|location| self.selected.contains(&location.id()))
    }

    /// Selected identifiers in list order
    #[must_use]
    pub fn selected_ids(&self) -> Vec<LocationId> {
        self.selected_locations().map(Location::id).collect()
    }

    /// Append a location and make it the only selected entry.
    ///
    /// # Errors
    /// `DuplicateIdentifier` when a location with the same identifier is
    /// already present. The store is left unchanged in that case.
    pub fn add(&mut self, location: Location) -> Result<()> {
        let id = location.id();
        if self.contains(id) {
            error!("Refusing to add duplicate location identifier {}", id);
            return Err(PlaceMapError::DuplicateIdentifier { id });
        }

        debug!("Adding location '{}' ({})", location.name, id);
        self.locations.push(location);
        self.selected.clear();
        self.selected.insert(id);

        self.emit(StoreEvent::Added(id));
        self.emit(StoreEvent::SelectionChanged(vec![id]));
        Ok(())
    }

    /// Remove a location if present; returns it.
    ///
    /// When something was removed the selection becomes the last
    /// remaining location, or empty when none remain.
    pub fn remove(&mut self, id: LocationId) -> Option<Location> {
        let index = self.locations.iter().position(|location| location.id() == id)?;
        let removed = self.locations.remove(index);
        debug!("Removed location '{}' ({})", removed.name, id);

        let before = self.selected_ids();
        self.selected.clear();
        if let Some(last) = self.locations.last() {
            self.selected.insert(last.id());
        }

        self.emit(StoreEvent::Removed(id));
        let after = self.selected_ids();
        if before != after {
            self.emit(StoreEvent::SelectionChanged(after));
        }
        Some(removed)
    }

    /// Replace the selection; identifiers not in the store are dropped.
    /// Returns whether the selection changed.
    pub fn select<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = LocationId>,
    {
        let next: HashSet<LocationId> = ids.into_iter().filter(|id| self.contains(*id)).collect();
        if next == self.selected {
            return false;
        }

        self.selected = next;
        let ids = self.selected_ids();
        debug!("Selection changed to {} location(s)", ids.len());
        self.emit(StoreEvent::SelectionChanged(ids));
        true
    }

    /// First location, in list order, matching `predicate`
    pub fn find<P>(&self, predicate: P) -> Option<&Location>
    where
        P: Fn(&Location) -> bool,
    {
        self.locations.iter().find(|location| predicate(location))
    }

    /// First location whose name contains `needle`, ignoring case
    #[must_use]
    pub fn find_by_name(&self, needle: &str) -> Option<&Location> {
        self.find(|location| location.name_contains(needle))
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn location(name: &str) -> Location {
        Location::new(
            name.to_string(),
            "Test".to_string(),
            Coordinate::new(10.0, 10.0),
        )
    }

    fn store_with(names: &[&str]) -> (LocationStore, Vec<LocationId>) {
        let mut store = LocationStore::new();
        let ids = names
            .iter()
            .map(|name| {
                let location = location(name);
                let id = location.id();
                store.add(location).unwrap();
                id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn test_add_selects_new_location() {
        let (store, ids) = store_with(&["London", "Paris"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.selected_ids(), vec![ids[1]]);
    }

    #[test]
    fn test_add_duplicate_identifier_fails() {
        let (mut store, ids) = store_with(&["London", "Paris"]);
        store.select([ids[0]]);

        let copy = store.get(ids[1]).unwrap().clone();
        let err = store.add(copy).unwrap_err();

        assert!(matches!(err, PlaceMapError::DuplicateIdentifier { id } if id == ids[1]));
        assert_eq!(store.len(), 2);
        assert_eq!(store.selected_ids(), vec![ids[0]]);
    }

    #[test]
    fn test_remove_selected_selects_last_remaining() {
        let (mut store, ids) = store_with(&["London", "Paris", "Rome"]);
        store.select([ids[1]]);

        let removed = store.remove(ids[1]).unwrap();
        assert_eq!(removed.id(), ids[1]);
        assert_eq!(store.selected_ids(), vec![ids[2]]);
    }

    #[test]
    fn test_remove_last_location_empties_selection() {
        let (mut store, ids) = store_with(&["London"]);
        store.remove(ids[0]);
        assert!(store.is_empty());
        assert!(store.selected_ids().is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let (mut store, ids) = store_with(&["London", "Paris"]);
        store.select([ids[0]]);

        assert!(store.remove(LocationId::new()).is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(store.selected_ids(), vec![ids[0]]);
    }

    #[test]
    fn test_select_drops_unknown_identifiers() {
        let (mut store, ids) = store_with(&["London", "Paris", "Rome"]);
        let changed = store.select([ids[2], LocationId::new(), ids[0]]);

        assert!(changed);
        assert_eq!(store.selected_ids(), vec![ids[0], ids[2]]);
        assert!(!store.select([ids[0], ids[2]]));
    }

    #[test]
    fn test_select_empty_clears() {
        let (mut store, _) = store_with(&["London"]);
        assert!(store.select(std::iter::empty()));
        assert!(store.selected_ids().is_empty());
    }

    #[test]
    fn test_find_by_name_returns_first_match() {
        let (store, ids) = store_with(&["Paris", "Paris, Texas"]);
        assert_eq!(store.find_by_name("PARIS").unwrap().id(), ids[0]);
        assert_eq!(store.find_by_name("texas").unwrap().id(), ids[1]);
        assert!(store.find_by_name("Berlin").is_none());
    }

    #[test]
    fn test_events_follow_mutations() {
        let mut store = LocationStore::new();
        let mut events = store.subscribe();

        let london = location("London");
        let id = london.id();
        store.add(london).unwrap();
        store.remove(id);

        assert_eq!(events.try_recv().unwrap(), StoreEvent::Added(id));
        assert_eq!(events.try_recv().unwrap(), StoreEvent::SelectionChanged(vec![id]));
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Removed(id));
        assert_eq!(events.try_recv().unwrap(), StoreEvent::SelectionChanged(vec![]));
        assert!(events.try_recv().is_err());
    }
}
