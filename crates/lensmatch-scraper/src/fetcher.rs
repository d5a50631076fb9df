use async_trait::async_trait;
use lensmatch_core::{Platform, PriceQuote};

/// A source of current prices for one platform.
///
/// `fetch_price` never fails: every transport, parse or browser problem is
/// logged inside the fetcher and surfaces as `None`.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch_price(&self, search_name: &str, lens_id: &str) -> Option<PriceQuote>;
}
