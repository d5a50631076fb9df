//! Per (client, lens) cooldown for on-demand price refreshes.

use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use tokio::sync::Mutex;

use crate::middleware::ClientIdentity;

/// Extracted caller identity used as the first half of the cooldown key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = ClientIdentity::from_extensions(&parts.extensions);
        Ok(Self(identity.key(
            &parts.headers,
            parts.extensions.get::<ConnectInfo<SocketAddr>>(),
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// At most one refresh per (client, lens) within `cooldown`. Rejected
/// requests do not extend the window.
#[derive(Debug, Clone)]
pub struct RefreshLimiter {
    cooldown: Duration,
    last_refresh: Arc<Mutex<HashMap<(String, String), Instant>>>,
}

impl RefreshLimiter {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_refresh: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn check(&self, client: &str, lens_id: &str) -> RefreshDecision {
        self.check_at(client, lens_id, Instant::now()).await
    }

    pub async fn check_at(&self, client: &str, lens_id: &str, now: Instant) -> RefreshDecision {
        let mut last_refresh = self.last_refresh.lock().await;
        last_refresh.retain(|_, at| now.duration_since(*at) < self.cooldown);

        let key = (client.to_string(), lens_id.to_string());
        if let Some(at) = last_refresh.get(&key) {
            let elapsed = now.duration_since(*at);
            return RefreshDecision::Limited {
                retry_after: self.cooldown.saturating_sub(elapsed),
            };
        }

        last_refresh.insert(key, now);
        RefreshDecision::Allowed
    }
}

/// Whole minutes until the caller may retry, rounded up and never zero.
#[must_use]
pub fn retry_after_minutes(retry_after: Duration) -> u64 {
    retry_after.as_secs().div_ceil(60).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn second_refresh_inside_window_is_limited() {
        let limiter = RefreshLimiter::new(COOLDOWN);
        let t0 = Instant::now();

        assert_eq!(limiter.check_at("1.2.3.4", "sony-fe-50", t0).await, RefreshDecision::Allowed);
        let decision = limiter
            .check_at("1.2.3.4", "sony-fe-50", t0 + Duration::from_secs(90))
            .await;
        assert_eq!(
            decision,
            RefreshDecision::Limited {
                retry_after: Duration::from_secs(510)
            }
        );
    }

    #[tokio::test]
    async fn other_lens_or_client_is_independent() {
        let limiter = RefreshLimiter::new(COOLDOWN);
        let t0 = Instant::now();

        assert_eq!(limiter.check_at("1.2.3.4", "sony-fe-50", t0).await, RefreshDecision::Allowed);
        assert_eq!(limiter.check_at("1.2.3.4", "nikon-50", t0).await, RefreshDecision::Allowed);
        assert_eq!(limiter.check_at("5.6.7.8", "sony-fe-50", t0).await, RefreshDecision::Allowed);
    }

    #[tokio::test]
    async fn window_elapses() {
        let limiter = RefreshLimiter::new(COOLDOWN);
        let t0 = Instant::now();

        assert_eq!(limiter.check_at("c", "l", t0).await, RefreshDecision::Allowed);
        assert_eq!(
            limiter.check_at("c", "l", t0 + COOLDOWN).await,
            RefreshDecision::Allowed
        );
    }

    #[test]
    fn retry_minutes_round_up_with_floor_of_one() {
        assert_eq!(retry_after_minutes(Duration::from_secs(510)), 9);
        assert_eq!(retry_after_minutes(Duration::from_secs(600)), 10);
        assert_eq!(retry_after_minutes(Duration::from_secs(1)), 1);
        assert_eq!(retry_after_minutes(Duration::ZERO), 1);
    }
}
