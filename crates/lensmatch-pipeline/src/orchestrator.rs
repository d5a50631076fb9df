//! Fetch → store → alert sequencing for one lens, the whole catalogue, or an
//! on-demand refresh.

use std::sync::Arc;
use std::time::Duration;

use lensmatch_core::{Catalogue, Lens, Platform, PriceQuote, SnapshotObservation};
use lensmatch_scraper::PriceFetcher;
use tokio::sync::Mutex;

use crate::error::{PipelineError, StoreError};
use crate::matcher::{AlertMatcher, MatchSummary};
use crate::store::Store;

const DEFAULT_PACING: Duration = Duration::from_secs(3);

/// Snapshots written by one fetch cycle. `None` means the fetcher returned
/// absence and nothing was stored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoredPrices {
    pub amazon: Option<SnapshotObservation>,
    pub flipkart: Option<SnapshotObservation>,
}

impl StoredPrices {
    #[must_use]
    pub fn written(&self) -> usize {
        usize::from(self.amazon.is_some()) + usize::from(self.flipkart.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensOutcome {
    pub lens_id: String,
    pub stored: StoredPrices,
    pub alerts: MatchSummary,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub lenses: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub snapshots_written: usize,
    pub notifications_sent: usize,
}

/// Drives both price fetchers, the snapshot store and the alert matcher.
///
/// Batch runs are serialized: a second [`Orchestrator::run_batch`] while one
/// is in flight returns `None` immediately.
pub struct Orchestrator {
    catalogue: Arc<Catalogue>,
    retail: Arc<dyn PriceFetcher>,
    affiliate: Arc<dyn PriceFetcher>,
    store: Arc<dyn Store>,
    matcher: AlertMatcher,
    pacing: Duration,
    batch_guard: Mutex<()>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("lenses", &self.catalogue.len())
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        catalogue: Arc<Catalogue>,
        retail: Arc<dyn PriceFetcher>,
        affiliate: Arc<dyn PriceFetcher>,
        store: Arc<dyn Store>,
        matcher: AlertMatcher,
    ) -> Self {
        Self {
            catalogue,
            retail,
            affiliate,
            store,
            matcher,
            pacing: DEFAULT_PACING,
            batch_guard: Mutex::new(()),
        }
    }

    /// Delay inserted between consecutive lenses of a batch run.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Runs both fetchers concurrently and stores every positive result.
    ///
    /// Both writes complete before this returns, so a following matcher pass
    /// sees the fresh prices.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a snapshot insert fails.
    pub async fn fetch_and_store(&self, lens: &Lens) -> Result<StoredPrices, StoreError> {
        let search_name = lens.search_name();
        let (retail, affiliate) = tokio::join!(
            self.retail.fetch_price(&search_name, &lens.id),
            self.affiliate.fetch_price(&search_name, &lens.id),
        );

        let mut stored = StoredPrices::default();
        for (fetcher, quote) in [(&self.retail, retail), (&self.affiliate, affiliate)] {
            let platform = fetcher.platform();
            let Some(observation) = self.store_quote(lens, platform, quote).await? else {
                continue;
            };
            match platform {
                Platform::Amazon => stored.amazon = Some(observation),
                Platform::Flipkart => stored.flipkart = Some(observation),
            }
        }

        Ok(stored)
    }

    async fn store_quote(
        &self,
        lens: &Lens,
        platform: Platform,
        quote: Option<PriceQuote>,
    ) -> Result<Option<SnapshotObservation>, StoreError> {
        let Some(quote) = quote.filter(|q| q.price > 0) else {
            tracing::info!(lens_id = %lens.id, %platform, "no price found");
            return Ok(None);
        };

        let observation = self
            .store
            .insert_snapshot(&lens.id, platform, quote.price, Some(&quote.url))
            .await?;
        tracing::info!(lens_id = %lens.id, %platform, price = quote.price, "price stored");
        Ok(Some(observation))
    }

    /// Fetch, store, then run the alert matcher for one lens.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if persistence fails at any step.
    pub async fn process_lens(&self, lens: &Lens) -> Result<LensOutcome, PipelineError> {
        let stored = self.fetch_and_store(lens).await?;
        let alerts = self.matcher.check_lens(lens).await?;
        Ok(LensOutcome {
            lens_id: lens.id.clone(),
            stored,
            alerts,
        })
    }

    /// On-demand refresh of one catalogue lens.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownLens`] if `lens_id` is not in the
    /// catalogue, or [`PipelineError::Store`] if persistence fails.
    pub async fn refresh_by_id(&self, lens_id: &str) -> Result<LensOutcome, PipelineError> {
        let lens = self
            .catalogue
            .find(lens_id)
            .ok_or_else(|| PipelineError::UnknownLens(lens_id.to_string()))?;
        tracing::info!(lens_id, "on-demand price refresh");
        self.process_lens(lens).await
    }

    /// Processes every catalogue lens in order, pacing between lenses.
    ///
    /// A failing lens is logged and counted; the run moves on. Returns `None`
    /// without doing anything if another batch is still running.
    pub async fn run_batch(&self) -> Option<BatchSummary> {
        let Ok(_guard) = self.batch_guard.try_lock() else {
            tracing::warn!("price batch already running; skipping this trigger");
            return None;
        };

        let lenses = self.catalogue.lenses();
        tracing::info!(count = lenses.len(), "price batch started");

        let mut summary = BatchSummary {
            lenses: lenses.len(),
            ..BatchSummary::default()
        };

        for (index, lens) in lenses.iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match self.process_lens(lens).await {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    summary.snapshots_written += outcome.stored.written();
                    summary.notifications_sent += outcome.alerts.notified;
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(lens_id = %lens.id, error = %e, "lens failed during price batch");
                }
            }
        }

        tracing::info!(
            lenses = summary.lenses,
            succeeded = summary.succeeded,
            failed = summary.failed,
            snapshots = summary.snapshots_written,
            notifications = summary.notifications_sent,
            "price batch complete"
        );
        Some(summary)
    }
}
