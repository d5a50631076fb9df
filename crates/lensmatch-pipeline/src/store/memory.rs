use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lensmatch_core::{
    AlertSubscription, AnalyticsEvent, NewAlert, Platform, RecordedEvent, SnapshotObservation,
};
use uuid::Uuid;

use super::{AlertStore, EventStore, SnapshotStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct State {
    snapshots: Vec<SnapshotObservation>,
    alerts: Vec<AlertSubscription>,
    events: Vec<RecordedEvent>,
    next_alert_id: i64,
    next_event_id: i64,
    failing_lenses: HashSet<String>,
}

impl State {
    fn check_available(&self, lens_id: &str) -> Result<(), StoreError> {
        if self.failing_lenses.contains(lens_id) {
            return Err(StoreError::Unavailable(format!(
                "injected failure for lens {lens_id}"
            )));
        }
        Ok(())
    }
}

/// In-process store with the same semantics as the Postgres tables.
///
/// With the `test-support` feature, `MemoryStore::fail_lens` makes every
/// snapshot and alert operation for one lens fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn fail_lens(&self, lens_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_lenses.insert(lens_id.to_string());
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn restore_lens(&self, lens_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_lenses.remove(lens_id);
        }
    }

    /// Appends an observation as-is, keeping its `observed_at`. Used to seed
    /// backdated history.
    pub fn push_snapshot(&self, observation: SnapshotObservation) {
        if let Ok(mut state) = self.state.lock() {
            state.snapshots.push(observation);
        }
    }

    /// Every stored observation for a lens in insertion order.
    #[must_use]
    pub fn snapshots(&self, lens_id: &str) -> Vec<SnapshotObservation> {
        self.state
            .lock()
            .map(|s| {
                s.snapshots
                    .iter()
                    .filter(|o| o.lens_id == lens_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn alerts(&self) -> Vec<AlertSubscription> {
        self.state
            .lock()
            .map(|s| s.alerts.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state
            .lock()
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn insert_snapshot(
        &self,
        lens_id: &str,
        platform: Platform,
        price: i64,
        url: Option<&str>,
    ) -> Result<SnapshotObservation, StoreError> {
        if price <= 0 {
            return Err(StoreError::InvalidPrice(price));
        }
        let mut state = self.lock()?;
        state.check_available(lens_id)?;

        let observation = SnapshotObservation {
            lens_id: lens_id.to_string(),
            platform,
            price,
            url: url.map(ToOwned::to_owned),
            source_kind: platform.source_kind(),
            observed_at: Utc::now(),
        };
        state.snapshots.push(observation.clone());
        Ok(observation)
    }

    async fn latest_per_platform(
        &self,
        lens_id: &str,
    ) -> Result<Vec<SnapshotObservation>, StoreError> {
        let state = self.lock()?;
        state.check_available(lens_id)?;

        // Equal timestamps resolve to the later insert.
        let latest = Platform::ALL
            .iter()
            .filter_map(|platform| {
                state
                    .snapshots
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| o.lens_id == lens_id && o.platform == *platform)
                    .max_by_key(|(idx, o)| (o.observed_at, *idx))
                    .map(|(_, o)| o.clone())
            })
            .collect();
        Ok(latest)
    }

    async fn history(
        &self,
        lens_id: &str,
        window_days: i32,
    ) -> Result<Vec<SnapshotObservation>, StoreError> {
        let state = self.lock()?;
        state.check_available(lens_id)?;

        let cutoff = Utc::now() - Duration::days(i64::from(window_days));
        let mut rows: Vec<(usize, SnapshotObservation)> = state
            .snapshots
            .iter()
            .enumerate()
            .filter(|(_, o)| o.lens_id == lens_id && o.observed_at >= cutoff)
            .map(|(idx, o)| (idx, o.clone()))
            .collect();
        rows.sort_by(|(ia, a), (ib, b)| b.observed_at.cmp(&a.observed_at).then(ib.cmp(ia)));
        Ok(rows.into_iter().map(|(_, o)| o).collect())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn upsert_alert(&self, alert: &NewAlert) -> Result<AlertSubscription, StoreError> {
        let mut state = self.lock()?;
        state.check_available(&alert.lens_id)?;
        let token = Uuid::new_v4();

        if let Some(existing) = state
            .alerts
            .iter_mut()
            .find(|a| a.email == alert.email && a.lens_id == alert.lens_id)
        {
            existing.target_price = alert.target_price;
            existing.consent = alert.consent;
            existing.unsubscribe_token = token;
            existing.triggered_at = None;
            return Ok(existing.clone());
        }

        state.next_alert_id += 1;
        let subscription = AlertSubscription {
            id: state.next_alert_id,
            email: alert.email.clone(),
            lens_id: alert.lens_id.clone(),
            target_price: alert.target_price,
            consent: alert.consent,
            unsubscribe_token: token,
            triggered_at: None,
            created_at: Utc::now(),
        };
        state.alerts.push(subscription.clone());
        Ok(subscription)
    }

    async fn armed_alerts(&self, lens_id: &str) -> Result<Vec<AlertSubscription>, StoreError> {
        let state = self.lock()?;
        state.check_available(lens_id)?;

        let mut armed: Vec<AlertSubscription> = state
            .alerts
            .iter()
            .filter(|a| a.lens_id == lens_id && a.is_armed())
            .cloned()
            .collect();
        armed.sort_by_key(|a| a.id);
        Ok(armed)
    }

    async fn mark_triggered(&self, alert_id: i64) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let Some(alert) = state
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id && a.triggered_at.is_none())
        else {
            return Ok(false);
        };
        alert.triggered_at = Some(Utc::now());
        Ok(true)
    }

    async fn unsubscribe(&self, token: Uuid) -> Result<Option<AlertSubscription>, StoreError> {
        let mut state = self.lock()?;
        let position = state
            .alerts
            .iter()
            .position(|a| a.unsubscribe_token == token);
        Ok(position.map(|idx| state.alerts.remove(idx)))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn record_event(&self, event: &AnalyticsEvent) -> Result<RecordedEvent, StoreError> {
        let mut state = self.lock()?;
        state.next_event_id += 1;
        let recorded = RecordedEvent {
            id: state.next_event_id,
            event: event.event.clone(),
            lens_id: event.lens_id.clone(),
            session_id: event.session_id.clone(),
            created_at: Utc::now(),
        };
        state.events.push(recorded.clone());
        Ok(recorded)
    }
}
