pub mod filter;
mod listing;
mod seen;

pub use listing::{GeoKey, GeoPoint, Listing};
pub use seen::SeenSet;
