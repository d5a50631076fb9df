//! Search-results markup → ordered candidate list → first organic quote.
//!
//! Markup drifts; the selectors below are the only place that knows about
//! it. The selection policy in [`select_first_organic`] works on
//! [`Candidate`]s and does not care where they came from.

use std::sync::LazyLock;

use lensmatch_core::PriceQuote;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

/// Container the fetcher waits for before reading the DOM.
pub const RESULT_SELECTOR: &str = r#"[data-component-type="s-search-result"]"#;

static RESULT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(RESULT_SELECTOR).expect("valid CSS selector"));

static SPONSORED: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#".s-sponsored-label-text, [data-component-type="s-ad-result"]"#)
        .expect("valid CSS selector")
});

static PRICE_WHOLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".a-price-whole").expect("valid CSS selector"));

static DETAIL_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "a.a-link-normal.s-no-outline[href*=\"/dp/\"], \
         a.a-link-normal.s-no-outline[href*=\"/gp/product/\"]",
    )
    .expect("valid CSS selector")
});

/// One search-result entry as read from the page, before any policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Parsed price, `None` when the entry has no readable price.
    pub price: Option<i64>,
    /// Raw `href` of the product-detail link; may be relative.
    pub url: Option<String>,
    pub sponsored: bool,
}

/// Reads every search-result entry in document order.
#[must_use]
pub fn extract_candidates(html: &str) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    document.select(&RESULT).map(read_candidate).collect()
}

fn read_candidate(item: ElementRef<'_>) -> Candidate {
    let sponsored = item.select(&SPONSORED).next().is_some()
        || item.value().attr("data-component-type") == Some("s-ad-result");

    let price = item
        .select(&PRICE_WHOLE)
        .next()
        .and_then(|el| parse_price_text(&el.text().collect::<String>()));

    let url = item
        .select(&DETAIL_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(ToOwned::to_owned);

    Candidate {
        price,
        url,
        sponsored,
    }
}

/// Strips every non-digit character and parses what is left.
///
/// `"31,200."` becomes `31200`. Returns `None` for empty input, zero, or
/// digit runs too long for an `i64`.
#[must_use]
pub fn parse_price_text(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().filter(|p| *p > 0)
}

/// Resolves a possibly-relative `href` against the site origin.
#[must_use]
pub fn resolve_url(href: &str, base_url: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(String::from)
}

/// Returns the first non-sponsored candidate with both a positive price and
/// a resolvable detail link.
#[must_use]
pub fn select_first_organic(candidates: &[Candidate], base_url: &str) -> Option<PriceQuote> {
    candidates
        .iter()
        .filter(|c| !c.sponsored)
        .find_map(|c| {
            let price = c.price?;
            let url = resolve_url(c.url.as_deref()?, base_url)?;
            PriceQuote::new(price, url)
        })
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
