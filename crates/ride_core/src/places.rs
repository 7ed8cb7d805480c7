//! Destination search: places lookup collaborator, fallback suggestions, query
//! debouncing, and recording the chosen destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ecs::Destination;
use crate::error::PlacesError;
use crate::geo::Coordinate;
use crate::records::{record_recent_destination, RecentDestination};
use crate::store::KeyValueStore;

#[cfg(feature = "http")]
pub mod client;

#[cfg(feature = "http")]
pub use client::GooglePlacesClient;

/// Quiet period after the last keystroke before a lookup runs.
pub const SEARCH_DEBOUNCE_MS: u64 = 250;

/// One row of the search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    /// Known up front for fallback entries; provider suggestions resolve it on selection.
    pub coordinate: Option<Coordinate>,
}

/// Free-text place search and id-to-coordinate resolution.
pub trait PlacesLookup: Send + Sync {
    fn autocomplete(
        &self,
        query: &str,
        near: Option<Coordinate>,
    ) -> Result<Vec<PlaceSuggestion>, PlacesError>;

    /// `Ok(None)` when the provider has no geometry for the id.
    fn resolve(&self, place_id: &str) -> Result<Option<Coordinate>, PlacesError>;
}

/// Suggestions shown for an empty query or when the lookup fails.
pub fn fallback_suggestions() -> Vec<PlaceSuggestion> {
    vec![
        PlaceSuggestion {
            id: "1".to_string(),
            name: "Airport".to_string(),
            subtitle: "SFO International".to_string(),
            coordinate: Some(Coordinate {
                latitude: 37.6213,
                longitude: -122.379,
            }),
        },
        PlaceSuggestion {
            id: "2".to_string(),
            name: "Downtown".to_string(),
            subtitle: "San Francisco".to_string(),
            coordinate: Some(Coordinate {
                latitude: 37.7858,
                longitude: -122.401,
            }),
        },
    ]
}

/// Run a search. Without a lookup, with an empty query, or on failure the
/// fallback list is returned.
pub fn search_places(
    lookup: Option<&dyn PlacesLookup>,
    query: &str,
    near: Option<Coordinate>,
) -> Vec<PlaceSuggestion> {
    let query = query.trim();
    if query.is_empty() {
        return fallback_suggestions();
    }
    let Some(lookup) = lookup else {
        debug!("no places lookup configured, using fallback suggestions");
        return fallback_suggestions();
    };
    match lookup.autocomplete(query, near) {
        Ok(suggestions) => suggestions,
        Err(error) => {
            warn!(%error, "places lookup failed, using fallback suggestions");
            fallback_suggestions()
        }
    }
}

/// Turn a picked suggestion into a destination and remember it.
///
/// Resolves the coordinate through `lookup` when the suggestion does not carry one.
/// Returns `None` when no coordinate can be found.
pub fn choose_destination(
    lookup: Option<&dyn PlacesLookup>,
    store: &dyn KeyValueStore,
    suggestion: &PlaceSuggestion,
    now: DateTime<Utc>,
) -> Option<Destination> {
    let coordinate = match suggestion.coordinate {
        Some(coordinate) => Some(coordinate),
        None => lookup.and_then(|lookup| match lookup.resolve(&suggestion.id) {
            Ok(coordinate) => coordinate,
            Err(error) => {
                warn!(%error, place_id = %suggestion.id, "failed to resolve place");
                None
            }
        }),
    };
    let Some(coordinate) = coordinate.filter(Coordinate::is_valid) else {
        warn!(place_id = %suggestion.id, "place has no usable coordinate");
        return None;
    };

    record_recent_destination(
        store,
        RecentDestination {
            id: Some(suggestion.id.clone()),
            name: suggestion.name.clone(),
            subtitle: suggestion.subtitle.clone(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            when: now.timestamp_millis(),
        },
    );

    Some(Destination {
        id: Some(suggestion.id.clone()),
        name: suggestion.name.clone(),
        subtitle: suggestion.subtitle.clone(),
        coordinate,
    })
}

/// Holds back a query until input has been quiet for [`SEARCH_DEBOUNCE_MS`].
///
/// Times are caller-supplied milliseconds, so the same debouncer works on a wall
/// clock or a simulation clock.
#[derive(Debug, Clone, Default)]
pub struct QueryDebouncer {
    delay_ms: u64,
    pending: Option<(String, u64)>,
}

impl QueryDebouncer {
    pub fn new() -> Self {
        Self::with_delay(SEARCH_DEBOUNCE_MS)
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Record a keystroke. Any earlier pending query is superseded.
    pub fn input(&mut self, query: impl Into<String>, now_ms: u64) {
        self.pending = Some((query.into(), now_ms.saturating_add(self.delay_ms)));
    }

    /// The query to run, once its quiet period has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Option<String> {
        match &self.pending {
            Some((_, due)) if now_ms >= *due => self.pending.take().map(|(query, _)| query),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debouncer_waits_for_quiet_period() {
        let mut debouncer = QueryDebouncer::new();
        debouncer.input("s", 0);
        debouncer.input("sf", 100);
        assert_eq!(debouncer.poll(300), None);
        assert_eq!(debouncer.poll(350).as_deref(), Some("sf"));
        assert_eq!(debouncer.poll(1_000), None);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn fallback_list_is_fixed() {
        let fallbacks = fallback_suggestions();
        assert_eq!(fallbacks.len(), 2);
        assert_eq!(fallbacks[0].name, "Airport");
        assert_eq!(fallbacks[1].subtitle, "San Francisco");
    }
}
