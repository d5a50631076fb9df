//! Retail price fetcher: headless-browser scrape of a storefront search page.

pub mod browser;
pub mod extract;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use lensmatch_core::{AppConfig, Platform, PriceQuote};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rand::Rng;

use crate::error::ScraperError;
use crate::fetcher::PriceFetcher;
use crate::retry::retry_with_pause;
use crate::user_agent::random_user_agent;

pub use browser::{BrowserLauncher, BrowserSession, ChromiumLauncher};
pub use extract::{extract_candidates, select_first_organic, Candidate, RESULT_SELECTOR};

#[derive(Debug, Clone)]
pub struct RetailFetcherConfig {
    /// Storefront origin, e.g. `https://www.amazon.in`.
    pub base_url: String,
    pub nav_timeout: Duration,
    pub selector_timeout: Duration,
    pub max_attempts: u32,
    pub retry_pause: Duration,
    /// Bounds of the randomized pause between page load and DOM read.
    pub settle_delay_min: Duration,
    pub settle_delay_max: Duration,
}

impl RetailFetcherConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.retail_base_url.clone(),
            nav_timeout: Duration::from_secs(config.scraper_nav_timeout_secs),
            selector_timeout: Duration::from_secs(config.scraper_selector_timeout_secs),
            max_attempts: config.scraper_max_attempts,
            retry_pause: Duration::from_millis(config.scraper_retry_pause_ms),
            settle_delay_min: Duration::from_secs(2),
            settle_delay_max: Duration::from_secs(5),
        }
    }
}

pub struct RetailPriceFetcher {
    launcher: Arc<dyn BrowserLauncher>,
    config: RetailFetcherConfig,
}

impl RetailPriceFetcher {
    #[must_use]
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: RetailFetcherConfig) -> Self {
        Self { launcher, config }
    }

    /// Builds the search-results URL for a product name.
    #[must_use]
    pub fn search_url(&self, search_name: &str) -> String {
        format!(
            "{}/s?k={}",
            self.config.base_url.trim_end_matches('/'),
            utf8_percent_encode(search_name, NON_ALPHANUMERIC)
        )
    }

    fn settle_delay(&self) -> Duration {
        let min = self.config.settle_delay_min;
        let max = self.config.settle_delay_max;
        if max <= min {
            return min;
        }
        rand::rng().random_range(min..=max)
    }

    async fn run_attempt(
        &self,
        session: &dyn BrowserSession,
        url: &str,
        lens_id: &str,
        attempt: u32,
    ) -> Result<PriceQuote, ScraperError> {
        tracing::debug!(lens_id, attempt, url, "loading retail search page");
        session.navigate(url, self.config.nav_timeout).await?;

        tokio::time::sleep(self.settle_delay()).await;

        session
            .wait_for_selector(RESULT_SELECTOR, self.config.selector_timeout)
            .await?;

        let html = session.content().await?;
        let candidates = extract_candidates(&html);
        tracing::debug!(lens_id, attempt, candidates = candidates.len(), "parsed search results");

        select_first_organic(&candidates, &self.config.base_url).ok_or_else(|| {
            ScraperError::NoEligibleResult {
                url: url.to_string(),
            }
        })
    }
}

#[async_trait]
impl PriceFetcher for RetailPriceFetcher {
    fn platform(&self) -> Platform {
        Platform::Amazon
    }

    async fn fetch_price(&self, search_name: &str, lens_id: &str) -> Option<PriceQuote> {
        let session = match self.launcher.launch(random_user_agent()).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(lens_id, error = %e, "retail browser session failed to launch");
                return None;
            }
        };

        let url = self.search_url(search_name);
        let session_ref: &dyn BrowserSession = session.as_ref();
        let url_ref = url.as_str();

        // The session must be closed on every path, including a panic inside an attempt.
        let outcome = AssertUnwindSafe(retry_with_pause(
            self.config.max_attempts,
            self.config.retry_pause,
            move |attempt| self.run_attempt(session_ref, url_ref, lens_id, attempt),
        ))
        .catch_unwind()
        .await;

        session.close().await;

        match outcome {
            Ok(Ok(quote)) => {
                tracing::info!(lens_id, price = quote.price, "retail price fetched");
                Some(quote)
            }
            Ok(Err(e)) => {
                tracing::warn!(lens_id, error = %e, "retail price unavailable after retries");
                None
            }
            Err(_) => {
                tracing::error!(lens_id, "retail fetch panicked; session closed");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "retail_test.rs"]
mod tests;
