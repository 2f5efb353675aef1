// src/domain/listing.rs

use chrono::NaiveDateTime;

/// A coordinate pair in the site's `[lat, lon]` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Exact identity of this point, usable as a map key.
    pub fn key(&self) -> GeoKey {
        GeoKey {
            lat_bits: self.lat.to_bits(),
            lon_bits: self.lon.to_bits(),
        }
    }
}

/// Hashable form of a `GeoPoint`. Two points are the same key only when both
/// coordinates are bit-for-bit identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeoKey {
    lat_bits: u64,
    lon_bits: u64,
}

/// One apartment posting, flattened from whatever the source returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    // Site posting id, informational only
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    pub price: f64,
    pub bedroom_count: u32,
    /// Free-text area from the posting. Replaced by the bounding box name
    /// when the listing falls inside a configured box.
    pub neighborhood_label: String,
    pub location: Option<GeoPoint>,
    pub posted: Option<NaiveDateTime>,
}

impl Listing {
    pub fn location_key(&self) -> Option<GeoKey> {
        self.location.map(|p| p.key())
    }

    /// Price as shown to humans: whole numbers without a trailing `.0`.
    pub fn display_price(&self) -> String {
        if self.price.fract() == 0.0 && self.price.abs() < 1e15 {
            format!("{}", self.price as i64)
        } else {
            format!("{:.2}", self.price)
        }
    }
}
