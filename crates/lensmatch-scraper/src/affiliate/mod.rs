//! Affiliate price fetcher: a single HTTPS search call to the partner API.

pub mod parse;

use std::time::Duration;

use async_trait::async_trait;
use lensmatch_core::{AppConfig, Platform, PriceQuote};
use reqwest::{Client, StatusCode};

use crate::error::ScraperError;
use crate::fetcher::PriceFetcher;

pub use parse::parse_search_response;

pub const AFFILIATE_USER_AGENT: &str = "LensMatch-India/2.0";
const SEARCH_PATH: &str = "/affiliate/1.0/search.json";
const RESULT_COUNT: u32 = 10;

#[derive(Debug, Clone)]
pub struct AffiliateCredentials {
    pub affiliate_id: String,
    pub token: String,
}

/// Partner search API client.
///
/// Without credentials every fetch is absence and no request is sent.
pub struct AffiliatePriceFetcher {
    client: Client,
    base_url: String,
    credentials: Option<AffiliateCredentials>,
}

impl std::fmt::Debug for AffiliatePriceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffiliatePriceFetcher")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl AffiliatePriceFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<AffiliateCredentials>,
        timeout_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(AFFILIATE_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
        })
    }

    /// Builds the fetcher from configuration. Credentials are only used when
    /// both the id and the token are set.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let credentials = match (&config.affiliate_id, &config.affiliate_token) {
            (Some(id), Some(token)) => Some(AffiliateCredentials {
                affiliate_id: id.clone(),
                token: token.clone(),
            }),
            _ => None,
        };
        Self::new(
            config.affiliate_base_url.clone(),
            credentials,
            config.affiliate_timeout_secs,
        )
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Runs the search and parses the body.
    ///
    /// `Ok(None)` means the response was valid but held no eligible product.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] on missing credentials, transport failure,
    /// non-200 status, or an unparseable body.
    pub async fn search(&self, search_name: &str) -> Result<Option<PriceQuote>, ScraperError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ScraperError::MissingCredentials)?;

        let url = format!("{}{SEARCH_PATH}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", search_name.to_string()),
                ("resultCount", RESULT_COUNT.to_string()),
            ])
            .header("Fk-Affiliate-Id", &credentials.affiliate_id)
            .header("Fk-Affiliate-Token", &credentials.token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ScraperError::UnexpectedStatus {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|source| ScraperError::Deserialize {
                context: "affiliate search response".to_string(),
                source,
            })?;

        Ok(parse_search_response(&json))
    }
}

#[async_trait]
impl PriceFetcher for AffiliatePriceFetcher {
    fn platform(&self) -> Platform {
        Platform::Flipkart
    }

    async fn fetch_price(&self, search_name: &str, lens_id: &str) -> Option<PriceQuote> {
        match self.search(search_name).await {
            Ok(Some(quote)) => {
                tracing::info!(lens_id, price = quote.price, "affiliate price fetched");
                Some(quote)
            }
            Ok(None) => {
                tracing::info!(lens_id, "affiliate search returned no eligible product");
                None
            }
            Err(ScraperError::MissingCredentials) => {
                tracing::warn!(lens_id, "affiliate credentials not configured; skipping");
                None
            }
            Err(e) => {
                tracing::warn!(lens_id, error = %e, "affiliate price fetch failed");
                None
            }
        }
    }
}
