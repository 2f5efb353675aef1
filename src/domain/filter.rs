// src/domain/filter.rs

use crate::config::Config;
use crate::domain::Listing;

/// Decides whether a listing matches the configured criteria.
///
/// A listing passes when its bedroom count equals the target exactly, its
/// price sits inside the configured range, it has a location, and (when any
/// bounding boxes are configured) that location falls inside one of them.
///
/// On a box match the listing's `neighborhood_label` is replaced with the
/// box name. Boxes are checked in declared order and the first match wins.
pub fn accepts(listing: &mut Listing, config: &Config) -> bool {
    if listing.bedroom_count != config.bed {
        return false;
    }
    if listing.price > config.max_price {
        return false;
    }
    if let Some(min) = config.min_price {
        if listing.price < min {
            return false;
        }
    }

    let Some(point) = listing.location else {
        return false;
    };

    if config.bounding_boxes.is_empty() {
        return true;
    }

    match config.bounding_boxes.iter().find(|b| b.contains(&point)) {
        Some(matched) => {
            listing.neighborhood_label = matched.name.clone();
            true
        }
        None => false,
    }
}

/// Keeps the accepted listings, in their original order.
pub fn filter(listings: Vec<Listing>, config: &Config) -> Vec<Listing> {
    listings
        .into_iter()
        .filter_map(|mut listing| accepts(&mut listing, config).then_some(listing))
        .collect()
}
