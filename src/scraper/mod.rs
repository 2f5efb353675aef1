mod models;
mod parse;
mod scraper;
mod scraper_error;

pub use self::scraper::{CraigslistScraper, ListingSource, SearchQuery};
pub use scraper_error::ScraperError;
