use crate::domain::{GeoPoint, Listing};
use chrono::NaiveDateTime;

// One row of a search results page, as scraped.
//
// result row
//  ├── id        (data-pid, or the number in the posting url)
//  ├── name      (title link text)
//  ├── url       (title link href)
//  ├── price     ("$1,800")
//  ├── housing   ("1br - 650ft2")
//  ├── where     ("(mission district)")
//  ├── datetime  (<time datetime="...">)
//  └── geotag    (data-latitude / data-longitude, rarely present on search pages)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    pub price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub where_: Option<String>,
    pub posted: Option<NaiveDateTime>,
    pub geotag: Option<GeoPoint>,
}

impl SearchResult {
    /// Flattens a scraped row into a `Listing`.
    ///
    /// The search query already restricts the bedroom count server-side, so a
    /// row whose housing text carries no bedroom count takes `queried_bed`.
    /// Rows with no price are unusable and yield `None`.
    pub fn into_listing(self, queried_bed: u32) -> Option<Listing> {
        let price = self.price?;
        Some(Listing {
            id: self.id,
            name: self.name,
            url: self.url,
            price,
            bedroom_count: self.bedrooms.unwrap_or(queried_bed),
            neighborhood_label: self.where_.unwrap_or_default(),
            location: self.geotag,
            posted: self.posted,
        })
    }
}
