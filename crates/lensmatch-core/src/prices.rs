use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storefront a price was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Retail search page, read through a headless browser.
    Amazon,
    /// Partner affiliate search API.
    Flipkart,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Amazon, Platform::Flipkart];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Amazon => "amazon",
            Platform::Flipkart => "flipkart",
        }
    }

    /// How prices for this platform are acquired.
    #[must_use]
    pub fn source_kind(self) -> SourceKind {
        match self {
            Platform::Amazon => SourceKind::Scraped,
            Platform::Flipkart => SourceKind::Api,
        }
    }

    /// Human-facing storefront name used in notification emails.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Amazon => "Amazon",
            Platform::Flipkart => "Flipkart",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amazon" => Ok(Platform::Amazon),
            "flipkart" => Ok(Platform::Flipkart),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Scraped,
    Api,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Scraped => "scraped",
            SourceKind::Api => "api",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scraped" => Ok(SourceKind::Scraped),
            "api" => Ok(SourceKind::Api),
            other => Err(format!("unknown source kind '{other}'")),
        }
    }
}

/// A price and listing URL returned by a fetcher.
///
/// `price` is in whole rupees and always positive once a fetcher hands it
/// out; fetchers drop anything else before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: i64,
    pub url: String,
}

impl PriceQuote {
    /// Builds a quote, rejecting non-positive prices and blank URLs.
    #[must_use]
    pub fn new(price: i64, url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        if price <= 0 || url.trim().is_empty() {
            return None;
        }
        Some(Self { price, url })
    }
}

/// One stored price observation for a lens on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotObservation {
    pub lens_id: String,
    pub platform: Platform,
    pub price: i64,
    pub url: Option<String>,
    pub source_kind: SourceKind,
    pub observed_at: DateTime<Utc>,
}
