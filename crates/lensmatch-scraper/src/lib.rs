pub mod affiliate;
pub mod error;
pub mod fetcher;
pub mod retail;
mod retry;
pub mod user_agent;

pub use affiliate::{AffiliateCredentials, AffiliatePriceFetcher};
pub use error::ScraperError;
pub use fetcher::PriceFetcher;
pub use retail::{
    BrowserLauncher, BrowserSession, ChromiumLauncher, RetailFetcherConfig, RetailPriceFetcher,
};
