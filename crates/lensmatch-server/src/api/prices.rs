use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use lensmatch_core::{build_prices_response, PlatformPrice, PricesResponse, SnapshotObservation};
use lensmatch_pipeline::{PipelineError, HISTORY_WINDOW_DAYS};
use serde::Serialize;

use super::{map_store_error, ApiError, AppState};
use crate::middleware::RequestId;
use crate::refresh_limit::{retry_after_minutes, ClientKey, RefreshDecision};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RefreshResponse {
    success: bool,
    amazon: Option<PlatformPrice>,
    flipkart: Option<PlatformPrice>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RefreshRateLimited {
    success: bool,
    rate_limited: bool,
    retry_after_minutes: u64,
}

fn platform_price(observation: &SnapshotObservation) -> PlatformPrice {
    PlatformPrice {
        price: observation.price,
        url: observation.url.clone(),
        updated_at: observation.observed_at,
    }
}

pub(super) async fn get_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(lens_id): Path<String>,
) -> Result<Json<PricesResponse>, ApiError> {
    if lens_id.trim().is_empty() {
        return Err(ApiError::new(req_id.0, "bad_request", "lensId is required"));
    }

    let latest = state
        .store
        .latest_per_platform(&lens_id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    let history = state
        .store
        .history(&lens_id, HISTORY_WINDOW_DAYS)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(build_prices_response(&latest, &history)))
}

/// Unknown lenses are rejected before the cooldown is consulted, so a bad id
/// never uses up a client's refresh window.
pub(super) async fn refresh_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ClientKey(client): ClientKey,
    Path(lens_id): Path<String>,
) -> Response {
    if state.orchestrator.catalogue().find(&lens_id).is_none() {
        return ApiError::new(req_id.0, "bad_request", "Unknown lens").into_response();
    }

    if let RefreshDecision::Limited { retry_after } =
        state.refresh_limiter.check(&client, &lens_id).await
    {
        tracing::info!(client = %client, lens_id = %lens_id, "refresh rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RefreshRateLimited {
                success: false,
                rate_limited: true,
                retry_after_minutes: retry_after_minutes(retry_after),
            }),
        )
            .into_response();
    }

    match state.orchestrator.refresh_by_id(&lens_id).await {
        Ok(outcome) => Json(RefreshResponse {
            success: true,
            amazon: outcome.stored.amazon.as_ref().map(platform_price),
            flipkart: outcome.stored.flipkart.as_ref().map(platform_price),
        })
        .into_response(),
        Err(PipelineError::UnknownLens(_)) => {
            ApiError::new(req_id.0, "bad_request", "Unknown lens").into_response()
        }
        Err(PipelineError::Store(e)) => map_store_error(req_id.0, &e).into_response(),
        Err(e) => {
            tracing::error!(lens_id = %lens_id, error = %e, "price refresh failed");
            ApiError::new(req_id.0, "internal_error", "Internal server error").into_response()
        }
    }
}
