//! Persistence seams used by the matcher, the orchestrator and the HTTP layer.
//!
//! [`PgStore`] is the production implementation; [`MemoryStore`] backs tests
//! and local dry runs.

mod memory;
mod pg;

use async_trait::async_trait;
use lensmatch_core::{
    AlertSubscription, AnalyticsEvent, NewAlert, Platform, RecordedEvent, SnapshotObservation,
};
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Append-only price observations.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Appends one observation. Implementations reject `price <= 0` without
    /// writing anything.
    async fn insert_snapshot(
        &self,
        lens_id: &str,
        platform: Platform,
        price: i64,
        url: Option<&str>,
    ) -> Result<SnapshotObservation, StoreError>;

    /// At most one observation per platform, the most recent.
    async fn latest_per_platform(
        &self,
        lens_id: &str,
    ) -> Result<Vec<SnapshotObservation>, StoreError>;

    /// Observations within the trailing `window_days`, newest first.
    async fn history(
        &self,
        lens_id: &str,
        window_days: i32,
    ) -> Result<Vec<SnapshotObservation>, StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Creates or re-arms the subscription for `(email, lens_id)` with a
    /// freshly issued unsubscribe token.
    async fn upsert_alert(&self, alert: &NewAlert) -> Result<AlertSubscription, StoreError>;

    /// Consented, untriggered subscriptions for a lens, ordered by id.
    async fn armed_alerts(&self, lens_id: &str) -> Result<Vec<AlertSubscription>, StoreError>;

    /// Sets `triggered_at` on an armed subscription. Returns `false` when the
    /// subscription was already triggered or is gone.
    async fn mark_triggered(&self, alert_id: i64) -> Result<bool, StoreError>;

    /// Deletes the subscription owning `token`.
    async fn unsubscribe(&self, token: Uuid) -> Result<Option<AlertSubscription>, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn record_event(&self, event: &AnalyticsEvent) -> Result<RecordedEvent, StoreError>;
}

/// Everything the pipeline and the HTTP layer persist.
pub trait Store: SnapshotStore + AlertStore + EventStore {}

impl<T: SnapshotStore + AlertStore + EventStore> Store for T {}
