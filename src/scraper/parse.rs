// src/scraper/parse.rs

use crate::domain::GeoPoint;
use crate::scraper::models::SearchResult;
use crate::scraper::ScraperError;
use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const BLOCKED_MARKER: &str = "has been automatically blocked";

// Older result markup, still served for some sites and query modes.
const LEGACY_ROW: &str = "li.result-row";
// Markup served to clients without javascript.
const STATIC_ROW: &str = "li.cl-static-search-result";

fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::HtmlParse(e.to_string()))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
}

/// Parses every result row on a search page. Either markup flavour is
/// accepted; an empty vec means the page had no results.
pub fn parse_search_page(html: &str, page_url: &Url) -> Result<Vec<SearchResult>, ScraperError> {
    if html.contains(BLOCKED_MARKER) {
        return Err(ScraperError::Blocked(page_url.to_string()));
    }

    let document = Html::parse_document(html);

    let legacy = selector(LEGACY_ROW)?;
    let rows: Vec<_> = document.select(&legacy).collect();
    if !rows.is_empty() {
        return parse_legacy_rows(&rows, page_url);
    }

    let stat = selector(STATIC_ROW)?;
    let rows: Vec<_> = document.select(&stat).collect();
    parse_static_rows(&rows, page_url)
}

fn parse_legacy_rows(rows: &[ElementRef<'_>], page_url: &Url) -> Result<Vec<SearchResult>, ScraperError> {
    let title = selector("a.result-title")?;
    let price = selector("span.result-price")?;
    let housing = selector("span.housing")?;
    let hood = selector("span.result-hood")?;
    let time = selector("time.result-date")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(link) = row.select(&title).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(|h| absolute(page_url, h)) else {
            continue;
        };

        let id = row
            .value()
            .attr("data-pid")
            .map(str::to_string)
            .or_else(|| posting_id_from_url(&url));

        let posted = row
            .select(&time)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(parse_posted);

        let geotag = match (row.value().attr("data-latitude"), row.value().attr("data-longitude")) {
            (Some(lat), Some(lon)) => parse_point(lat, lon),
            _ => None,
        };

        out.push(SearchResult {
            id,
            name: text_of(link),
            url,
            price: first_text(*row, &price).as_deref().and_then(parse_price),
            bedrooms: first_text(*row, &housing).as_deref().and_then(parse_bedrooms),
            where_: first_text(*row, &hood).map(|h| clean_where(&h)),
            posted,
            geotag,
        });
    }
    Ok(out)
}

fn parse_static_rows(rows: &[ElementRef<'_>], page_url: &Url) -> Result<Vec<SearchResult>, ScraperError> {
    let link = selector("a")?;
    let title = selector("div.title")?;
    let price = selector("div.price")?;
    let location = selector("div.location")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(a) = row.select(&link).next() else {
            continue;
        };
        let Some(url) = a.value().attr("href").and_then(|h| absolute(page_url, h)) else {
            continue;
        };

        let name = first_text(*row, &title)
            .or_else(|| row.value().attr("title").map(str::to_string))
            .unwrap_or_default();

        out.push(SearchResult {
            id: posting_id_from_url(&url),
            name,
            price: first_text(*row, &price).as_deref().and_then(parse_price),
            bedrooms: None,
            where_: first_text(*row, &location).map(|h| clean_where(&h)),
            posted: None,
            geotag: None,
            url,
        });
    }
    Ok(out)
}

/// Reads the map coordinates off a posting page.
pub fn parse_geotag(html: &str) -> Option<GeoPoint> {
    let document = Html::parse_document(html);
    let map = Selector::parse("#map").ok()?;
    let el = document.select(&map).next()?;
    parse_point(el.value().attr("data-latitude")?, el.value().attr("data-longitude")?)
}

fn parse_point(lat: &str, lon: &str) -> Option<GeoPoint> {
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    Some(GeoPoint::new(lat, lon))
}

fn absolute(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

/// "$1,800" -> 1800.0
pub fn parse_price(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// "1br - 650ft2 -" -> 1
pub fn parse_bedrooms(raw: &str) -> Option<u32> {
    raw.split(|c: char| c.is_whitespace() || c == '/' || c == '-')
        .find_map(|token| token.strip_suffix("br").and_then(|n| n.parse().ok()))
}

/// " (mission district)" -> "mission district"
fn clean_where(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string()
}

fn parse_posted(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// ".../d/sunny-studio/7512345678.html" -> "7512345678"
pub fn posting_id_from_url(url: &str) -> Option<String> {
    let last = url.rsplit('/').next()?;
    let stem = last.strip_suffix(".html")?;
    (!stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit())).then(|| stem.to_string())
}
