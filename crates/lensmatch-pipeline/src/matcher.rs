//! Alert matching: armed subscriptions against the latest price per platform.

use std::sync::Arc;

use lensmatch_core::{AlertSubscription, Lens, SnapshotObservation};
use lensmatch_notify::{unsubscribe_url, Mailer, PriceAlertEmail};

use crate::error::StoreError;
use crate::store::Store;

/// Counts from one matcher pass over a lens.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchSummary {
    pub armed: usize,
    pub notified: usize,
    pub send_failures: usize,
}

pub struct AlertMatcher {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
}

impl std::fmt::Debug for AlertMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertMatcher")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl AlertMatcher {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            public_base_url: public_base_url.into(),
        }
    }

    /// Evaluates every armed subscription for `lens` against the latest
    /// snapshot per platform.
    ///
    /// A subscription gets at most one email per pass. Qualifying platforms are
    /// tried cheapest first; the first accepted send marks the subscription
    /// triggered. A failed send leaves it armed for the next pass.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if loading subscriptions or snapshots, or marking
    /// a subscription triggered, fails.
    pub async fn check_lens(&self, lens: &Lens) -> Result<MatchSummary, StoreError> {
        let armed = self.store.armed_alerts(&lens.id).await?;
        let mut summary = MatchSummary {
            armed: armed.len(),
            ..MatchSummary::default()
        };
        if armed.is_empty() {
            return Ok(summary);
        }

        let latest = self.store.latest_per_platform(&lens.id).await?;
        let lens_name = lens.search_name();

        for subscription in &armed {
            for snapshot in qualifying(subscription, &latest) {
                match self.notify(subscription, snapshot, &lens_name).await {
                    Ok(()) => {
                        if !self.store.mark_triggered(subscription.id).await? {
                            tracing::debug!(
                                alert_id = subscription.id,
                                "subscription was already triggered"
                            );
                        }
                        summary.notified += 1;
                        tracing::info!(
                            alert_id = subscription.id,
                            lens_id = %lens.id,
                            platform = %snapshot.platform,
                            price = snapshot.price,
                            "price alert sent"
                        );
                        break;
                    }
                    Err(e) => {
                        summary.send_failures += 1;
                        tracing::warn!(
                            alert_id = subscription.id,
                            lens_id = %lens.id,
                            platform = %snapshot.platform,
                            error = %e,
                            "price alert not sent; subscription stays armed"
                        );
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn notify(
        &self,
        subscription: &AlertSubscription,
        snapshot: &SnapshotObservation,
        lens_name: &str,
    ) -> Result<(), lensmatch_notify::NotifyError> {
        let email = PriceAlertEmail {
            to: subscription.email.clone(),
            lens_name: lens_name.to_string(),
            price: snapshot.price,
            platform: snapshot.platform,
            buy_url: snapshot.url.clone().unwrap_or_default(),
            unsubscribe_url: unsubscribe_url(&self.public_base_url, subscription.unsubscribe_token),
        };
        self.mailer.send_price_alert(&email).await
    }
}

/// Latest snapshots at or under the subscription's target, cheapest first.
fn qualifying<'a>(
    subscription: &AlertSubscription,
    latest: &'a [SnapshotObservation],
) -> Vec<&'a SnapshotObservation> {
    let mut matches: Vec<&SnapshotObservation> = latest
        .iter()
        .filter(|s| s.price > 0 && subscription.is_met_by(s.price))
        .collect();
    matches.sort_by_key(|s| (s.price, s.platform));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensmatch_core::{NewAlert, Platform};
    use lensmatch_notify::RecordingMailer;
    use rust_decimal::Decimal;

    use crate::store::{AlertStore, MemoryStore, SnapshotStore};

    fn lens() -> Lens {
        Lens {
            id: "sony-fe-50".to_string(),
            name: "FE 50mm f/1.8".to_string(),
            brand: Some("Sony".to_string()),
        }
    }

    fn new_alert(email: &str, target: i64) -> NewAlert {
        NewAlert {
            email: email.to_string(),
            lens_id: "sony-fe-50".to_string(),
            target_price: Decimal::from(target),
            consent: true,
        }
    }

    fn matcher(store: &Arc<MemoryStore>, mailer: &Arc<RecordingMailer>) -> AlertMatcher {
        AlertMatcher::new(
            Arc::clone(store) as Arc<dyn Store>,
            Arc::clone(mailer) as Arc<dyn Mailer>,
            "https://api.lensmatch.in",
        )
    }

    async fn seed_price(store: &MemoryStore, platform: Platform, price: i64) {
        store
            .insert_snapshot(
                "sony-fe-50",
                platform,
                price,
                Some(&format!("https://{platform}.example/sony-fe-50")),
            )
            .await
            .expect("seed snapshot");
    }

    #[tokio::test]
    async fn notifies_once_then_stays_quiet() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let alert = store.upsert_alert(&new_alert("a@example.com", 30_000)).await.unwrap();
        seed_price(&store, Platform::Flipkart, 29_999).await;

        let matcher = matcher(&store, &mailer);
        let first = matcher.check_lens(&lens()).await.unwrap();
        assert_eq!(first.notified, 1);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.com");
        assert_eq!(sent[0].lens_name, "Sony FE 50mm f/1.8");
        assert_eq!(sent[0].price, 29_999);
        assert_eq!(sent[0].platform, Platform::Flipkart);
        assert_eq!(
            sent[0].unsubscribe_url,
            format!(
                "https://api.lensmatch.in/api/alerts/unsubscribe?token={}",
                alert.unsubscribe_token
            )
        );
        assert!(store.alerts()[0].triggered_at.is_some());

        let second = matcher.check_lens(&lens()).await.unwrap();
        assert_eq!(second, MatchSummary::default());
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn price_above_target_does_not_notify() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        store.upsert_alert(&new_alert("a@example.com", 30_000)).await.unwrap();
        seed_price(&store, Platform::Amazon, 30_001).await;

        let summary = matcher(&store, &mailer).check_lens(&lens()).await.unwrap();
        assert_eq!(summary.armed, 1);
        assert_eq!(summary.notified, 0);
        assert!(mailer.sent().is_empty());
        assert!(store.alerts()[0].triggered_at.is_none());
    }

    #[tokio::test]
    async fn two_qualifying_platforms_send_one_email_for_cheapest() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        store.upsert_alert(&new_alert("a@example.com", 35_000)).await.unwrap();
        seed_price(&store, Platform::Amazon, 31_200).await;
        seed_price(&store, Platform::Flipkart, 30_800).await;

        let summary = matcher(&store, &mailer).check_lens(&lens()).await.unwrap();
        assert_eq!(summary.notified, 1);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].platform, Platform::Flipkart);
        assert_eq!(sent[0].price, 30_800);
    }

    #[tokio::test]
    async fn send_failure_leaves_subscription_armed() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        store.upsert_alert(&new_alert("down@example.com", 30_000)).await.unwrap();
        store.upsert_alert(&new_alert("ok@example.com", 30_000)).await.unwrap();
        seed_price(&store, Platform::Amazon, 29_000).await;
        mailer.fail_for("down@example.com");

        let matcher = matcher(&store, &mailer);
        let summary = matcher.check_lens(&lens()).await.unwrap();
        assert_eq!(summary.notified, 1);
        assert_eq!(summary.send_failures, 1);
        assert_eq!(store.armed_alerts("sony-fe-50").await.unwrap().len(), 1);

        mailer.recover("down@example.com");
        let retry = matcher.check_lens(&lens()).await.unwrap();
        assert_eq!(retry.notified, 1);
        assert!(store.armed_alerts("sony-fe-50").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_without_url_is_a_send_failure() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        store.upsert_alert(&new_alert("a@example.com", 30_000)).await.unwrap();
        store
            .insert_snapshot("sony-fe-50", Platform::Amazon, 25_000, None)
            .await
            .unwrap();

        let summary = matcher(&store, &mailer).check_lens(&lens()).await.unwrap();
        assert_eq!(summary.send_failures, 1);
        assert!(mailer.sent().is_empty());
        assert!(store.alerts()[0].triggered_at.is_none());
    }

    #[tokio::test]
    async fn unconsented_subscription_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let mut alert = new_alert("a@example.com", 30_000);
        alert.consent = false;
        store.upsert_alert(&alert).await.unwrap();
        seed_price(&store, Platform::Amazon, 20_000).await;

        let summary = matcher(&store, &mailer).check_lens(&lens()).await.unwrap();
        assert_eq!(summary.armed, 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        store.fail_lens("sony-fe-50");

        let err = matcher(&store, &mailer).check_lens(&lens()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
