use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Paths that never count against the general limit.
const RATE_LIMIT_EXEMPT: &[&str] = &["/health"];

#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `client` at `now`. Returns `false` once the
    /// client has used up its window.
    pub async fn admit_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().await;
        clients.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let window = clients.entry(client.to_string()).or_insert(RateLimitWindow {
            started_at: now,
            count: 0,
        });
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

/// How a caller is identified for rate limiting.
///
/// Installed as a request extension by `build_app`. By default the socket
/// peer is the identity; `X-Forwarded-For` is only read when the server is
/// configured to sit behind a trusted proxy, since any caller can set it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    trust_forwarded_for: bool,
}

impl ClientIdentity {
    #[must_use]
    pub fn new(trust_forwarded_for: bool) -> Self {
        Self {
            trust_forwarded_for,
        }
    }

    /// Peer IP, or the first `x-forwarded-for` hop when trusted. Falls back to
    /// a shared bucket when neither is known.
    pub fn key(self, headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
        let forwarded = || {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };

        self.trust_forwarded_for
            .then(forwarded)
            .flatten()
            .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Reads the installed policy from request extensions.
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions.get::<Self>().copied().unwrap_or_default()
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing the general per-client request limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if RATE_LIMIT_EXEMPT.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let client = ClientIdentity::from_extensions(req.extensions()).key(
        req.headers(),
        req.extensions().get::<ConnectInfo<SocketAddr>>(),
    );

    if !rate_limit.admit_at(&client, Instant::now()).await {
        tracing::warn!(client = %client, path = %req.uri().path(), "general rate limit exceeded");
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_default();
        return ApiError::new(
            request_id,
            "rate_limited",
            "Too many requests, please try again later",
        )
        .into_response();
    }

    next.run(req).await
}
