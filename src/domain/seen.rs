// src/domain/seen.rs

use crate::domain::{GeoKey, Listing};
use std::collections::HashMap;

/// Every listing we have already reported, keyed by location.
///
/// Lives only as long as the process. Entries are overwritten, never removed.
#[derive(Debug, Default)]
pub struct SeenSet {
    by_location: HashMap<GeoKey, Listing>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }

    pub fn contains(&self, listing: &Listing) -> bool {
        listing
            .location_key()
            .is_some_and(|key| self.by_location.contains_key(&key))
    }

    #[cfg(test)]
    pub fn get(&self, key: &GeoKey) -> Option<&Listing> {
        self.by_location.get(key)
    }

    /// Listings from `batch` whose location has not been seen, in batch order.
    /// Listings without a location are skipped; they can never be keyed.
    pub fn new_listings(&self, batch: &[Listing]) -> Vec<Listing> {
        batch
            .iter()
            .filter(|l| l.location.is_some() && !self.contains(l))
            .cloned()
            .collect()
    }

    /// Records `listing` under its location, replacing any earlier entry.
    /// Returns false when the listing has no location to key on.
    pub fn mark_seen(&mut self, listing: Listing) -> bool {
        match listing.location_key() {
            Some(key) => {
                self.by_location.insert(key, listing);
                true
            }
            None => false,
        }
    }
}
