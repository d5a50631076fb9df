use async_trait::async_trait;
use lensmatch_core::{
    AlertSubscription, AnalyticsEvent, NewAlert, Platform, RecordedEvent, SnapshotObservation,
};
use lensmatch_db::PriceSnapshotRow;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AlertStore, EventStore, SnapshotStore};
use crate::error::StoreError;

/// Postgres-backed store over the `lensmatch-db` query functions.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_observations(rows: Vec<PriceSnapshotRow>) -> Result<Vec<SnapshotObservation>, StoreError> {
    rows.into_iter()
        .map(|row| row.into_observation().map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn insert_snapshot(
        &self,
        lens_id: &str,
        platform: Platform,
        price: i64,
        url: Option<&str>,
    ) -> Result<SnapshotObservation, StoreError> {
        let row = lensmatch_db::insert_price_snapshot(&self.pool, lens_id, platform, price, url)
            .await?;
        Ok(row.into_observation()?)
    }

    async fn latest_per_platform(
        &self,
        lens_id: &str,
    ) -> Result<Vec<SnapshotObservation>, StoreError> {
        let rows = lensmatch_db::list_latest_per_platform(&self.pool, lens_id).await?;
        into_observations(rows)
    }

    async fn history(
        &self,
        lens_id: &str,
        window_days: i32,
    ) -> Result<Vec<SnapshotObservation>, StoreError> {
        let rows = lensmatch_db::list_price_history(&self.pool, lens_id, window_days).await?;
        into_observations(rows)
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn upsert_alert(&self, alert: &NewAlert) -> Result<AlertSubscription, StoreError> {
        let row = lensmatch_db::upsert_alert(&self.pool, alert, Uuid::new_v4()).await?;
        Ok(row.into())
    }

    async fn armed_alerts(&self, lens_id: &str) -> Result<Vec<AlertSubscription>, StoreError> {
        let rows = lensmatch_db::list_armed_alerts(&self.pool, lens_id).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_triggered(&self, alert_id: i64) -> Result<bool, StoreError> {
        Ok(lensmatch_db::mark_alert_triggered(&self.pool, alert_id).await?)
    }

    async fn unsubscribe(&self, token: Uuid) -> Result<Option<AlertSubscription>, StoreError> {
        let row = lensmatch_db::delete_alert_by_token(&self.pool, token).await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn record_event(&self, event: &AnalyticsEvent) -> Result<RecordedEvent, StoreError> {
        let row = lensmatch_db::insert_analytics_event(
            &self.pool,
            &event.event,
            event.lens_id.as_deref(),
            &event.session_id,
        )
        .await?;
        Ok(row.into())
    }
}
