// scraper.rs
use crate::config::Config;
use crate::domain::{GeoPoint, Listing};
use crate::scraper::models::SearchResult;
use crate::scraper::parse::{parse_geotag, parse_search_page};
use crate::scraper::ScraperError;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

// Craigslist's "apartments / housing for rent" category.
const CATEGORY: &str = "apa";

/// Anything that can hand back the current set of apartment listings.
pub trait ListingSource {
    fn fetch_listings(&mut self) -> Result<Vec<Listing>, ScraperError>;
}

/// The server-side part of the search: category, price, bedrooms, ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub site: String,
    pub area: Option<String>,
    pub bed: u32,
    pub min_price: Option<f64>,
    pub max_price: f64,
    pub limit: usize,
}

impl SearchQuery {
    pub fn from_config(config: &Config) -> Self {
        Self {
            site: config.craigslist_site.clone(),
            area: config.craigslist_area.clone(),
            bed: config.bed,
            min_price: config.min_price,
            max_price: config.max_price,
            limit: config.result_limit,
        }
    }

    /// Search url for the results page starting at `offset`, newest first.
    pub fn page_url(&self, offset: usize) -> Result<Url, ScraperError> {
        if !is_url_segment(&self.site) {
            return Err(ScraperError::Query(format!("invalid site '{}'", self.site)));
        }
        if let Some(area) = self.area.as_deref().filter(|a| !is_url_segment(a)) {
            return Err(ScraperError::Query(format!("invalid area '{area}'")));
        }

        let path = match &self.area {
            Some(area) => format!("/search/{area}/{CATEGORY}"),
            None => format!("/search/{CATEGORY}"),
        };
        let mut url = Url::parse(&format!("https://{}.craigslist.org{path}", self.site))
            .map_err(|e| ScraperError::Query(e.to_string()))?;

        {
            let mut q = url.query_pairs_mut();
            q.append_pair("sort", "date");
            q.append_pair("max_price", &price_param(self.max_price));
            if let Some(min) = self.min_price {
                q.append_pair("min_price", &price_param(min));
            }
            q.append_pair("min_bedrooms", &self.bed.to_string());
            q.append_pair("max_bedrooms", &self.bed.to_string());
            if offset > 0 {
                q.append_pair("s", &offset.to_string());
            }
        }

        Ok(url)
    }
}

// Site and area names are spliced into the host and path as-is.
fn is_url_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn price_param(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{}", price as i64)
    } else {
        format!("{price}")
    }
}

pub struct CraigslistScraper {
    client: Client,
    query: SearchQuery,
    page_pause: Duration,
    // Posting id (or url) -> coordinates from its posting page. `None` is
    // cached too so postings without a map are fetched only once.
    geotags: HashMap<String, Option<GeoPoint>>,
}

impl CraigslistScraper {
    pub fn new(query: SearchQuery) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        Ok(Self {
            client,
            query,
            page_pause: Duration::from_secs(2),
            geotags: HashMap::new(),
        })
    }

    /// Walks the result pages until the site runs out, repeats itself, or
    /// the result limit is reached.
    pub fn fetch_search_results(&self) -> Result<Vec<SearchResult>, ScraperError> {
        let mut results: Vec<SearchResult> = Vec::new();
        let mut seen_rows = HashSet::new();
        let mut offset = 0;

        loop {
            let page_url = self.query.page_url(offset)?;
            debug!(%page_url, "Fetching search page");

            let html = self.fetch_html(page_url.as_str())?;
            let rows = parse_search_page(&html, &page_url)?;
            if rows.is_empty() {
                debug!("No more results at offset {offset}");
                break;
            }

            let page_len = rows.len();
            let mut fresh = 0;
            for row in rows {
                let identity = row.id.clone().unwrap_or_else(|| row.url.clone());
                if seen_rows.insert(identity) {
                    fresh += 1;
                    results.push(row);
                }
                if results.len() >= self.query.limit {
                    break;
                }
            }

            if results.len() >= self.query.limit {
                break;
            }
            // The site ignores offsets past its last page and serves the same rows again.
            if fresh == 0 {
                debug!("Page at offset {offset} repeated earlier rows, stopping");
                break;
            }

            offset += page_len;
            std::thread::sleep(self.page_pause);
        }

        Ok(results)
    }

    pub fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        const MAX_ATTEMPTS: u64 = 3;
        const MAX_BACKOFF_SECS: u64 = 10;
        const JITTER_MAX_SECS: u64 = 2;

        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let start = Instant::now();

            match self.try_fetch_html(url) {
                Ok(html) => {
                    debug!("Fetched {url} on attempt {attempt} in {:?}", start.elapsed());
                    return Ok(html);
                }
                Err(e @ ScraperError::Blocked(_)) => return Err(e),
                Err(e) => {
                    warn!("Attempt {attempt} for {url} failed in {:?}: {e}", start.elapsed());
                    last_err = Some(e);

                    if attempt < MAX_ATTEMPTS {
                        let base = std::cmp::min(2 * attempt, MAX_BACKOFF_SECS);
                        let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_SECS);
                        std::thread::sleep(Duration::from_secs(base + jitter));
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ScraperError::Network(format!("retry loop failed for {url}"))))
    }

    fn try_fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScraperError::Blocked(format!("HTTP {status} from {url}")));
        }
        if !status.is_success() {
            return Err(ScraperError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text().map_err(|e| ScraperError::Network(e.to_string()))
    }
}

/// Fills in coordinates the search page left out by reading each posting.
///
/// Sleeps `pause` before every posting fetch. A block ends the walk at once;
/// other failures are logged and the posting is retried next cycle.
fn resolve_geotags(
    cache: &mut HashMap<String, Option<GeoPoint>>,
    rows: &mut [SearchResult],
    pause: Duration,
    mut fetch: impl FnMut(&str) -> Result<String, ScraperError>,
) -> Result<(), ScraperError> {
    for row in rows.iter_mut().filter(|r| r.geotag.is_none()) {
        let key = row.id.clone().unwrap_or_else(|| row.url.clone());

        if let Some(cached) = cache.get(&key) {
            row.geotag = *cached;
            continue;
        }

        std::thread::sleep(pause);
        match fetch(&row.url) {
            Ok(html) => {
                let point = parse_geotag(&html);
                cache.insert(key, point);
                row.geotag = point;
            }
            Err(e @ ScraperError::Blocked(_)) => return Err(e),
            // Not cached; the next cycle tries again.
            Err(e) => warn!("Could not read posting {}: {e}", row.url),
        }
    }
    Ok(())
}

impl ListingSource for CraigslistScraper {
    fn fetch_listings(&mut self) -> Result<Vec<Listing>, ScraperError> {
        let mut rows = self.fetch_search_results()?;

        let mut cache = std::mem::take(&mut self.geotags);
        let resolved = resolve_geotags(&mut cache, &mut rows, self.page_pause, |url| self.fetch_html(url));
        self.geotags = cache;
        resolved?;

        let total = rows.len();
        let bed = self.query.bed;
        // Geotagged results only.
        let listings: Vec<Listing> = rows
            .into_iter()
            .filter(|r| r.geotag.is_some())
            .filter_map(|r| r.into_listing(bed))
            .collect();

        info!(
            "Fetched {total} results from {}, {} usable",
            self.query.site,
            listings.len()
        );
        Ok(listings)
    }
}
