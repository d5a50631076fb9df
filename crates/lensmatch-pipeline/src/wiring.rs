//! Production assembly of the orchestrator from [`AppConfig`].

use std::sync::Arc;
use std::time::Duration;

use lensmatch_core::{AppConfig, Catalogue};
use lensmatch_notify::mailer_from_app_config;
use lensmatch_scraper::{
    AffiliatePriceFetcher, ChromiumLauncher, RetailFetcherConfig, RetailPriceFetcher,
};

use crate::error::PipelineError;
use crate::matcher::AlertMatcher;
use crate::orchestrator::Orchestrator;
use crate::store::Store;

/// Builds the orchestrator with the Chromium retail fetcher, the affiliate
/// API fetcher and the configured mail transport.
///
/// # Errors
///
/// Returns [`PipelineError::Fetcher`] or [`PipelineError::Mailer`] if an HTTP
/// client cannot be constructed.
pub fn build_orchestrator(
    config: &AppConfig,
    catalogue: Arc<Catalogue>,
    store: Arc<dyn Store>,
) -> Result<Orchestrator, PipelineError> {
    let launcher = Arc::new(ChromiumLauncher::new(config.chrome_path.clone()));
    let retail = Arc::new(RetailPriceFetcher::new(
        launcher,
        RetailFetcherConfig::from_app_config(config),
    ));

    let affiliate = AffiliatePriceFetcher::from_app_config(config)?;
    if !affiliate.is_configured() {
        tracing::warn!("affiliate credentials not set; flipkart prices will be skipped");
    }

    let mailer = mailer_from_app_config(config)?;
    let matcher = AlertMatcher::new(
        Arc::clone(&store),
        mailer,
        config.public_base_url.clone(),
    );

    Ok(Orchestrator::new(catalogue, retail, Arc::new(affiliate), store, matcher)
        .with_pacing(Duration::from_millis(config.batch_pacing_ms)))
}
