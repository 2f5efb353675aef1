use crate::domain::Listing;
use maud::{html, Markup, DOCTYPE};

pub const TITLE: &str = "New apartment found!";

/// `<a href="URL">NAME</a> in NEIGHBORHOOD for PRICE`
pub fn listing_line(listing: &Listing) -> Markup {
    html! {
        a href=(listing.url) { (listing.name) }
        " in " (listing.neighborhood_label) " for " (listing.display_price())
    }
}

pub fn listing_email(listing: &Listing) -> Markup {
    html! {
        (DOCTYPE)
        html {
            body style="font-family: Arial, sans-serif; color: #333;" {
                p { (listing_line(listing)) }
            }
        }
    }
}

/// Plain-text alternative for mail clients that skip HTML.
pub fn listing_text(listing: &Listing) -> String {
    format!(
        "{} in {} for {}\n{}",
        listing.name,
        listing.neighborhood_label,
        listing.display_price(),
        listing.url
    )
}
