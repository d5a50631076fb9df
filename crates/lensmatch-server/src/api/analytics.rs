use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use lensmatch_core::{is_known_event, AnalyticsEvent, RecordedEvent, ANALYTICS_EVENTS};
use serde::{Deserialize, Serialize};

use super::{map_store_error, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordEventRequest {
    event: Option<String>,
    lens_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct EventRecorded {
    #[serde(flatten)]
    event: RecordedEvent,
    message: &'static str,
}

fn validate(body: RecordEventRequest) -> Result<AnalyticsEvent, String> {
    let event = body
        .event
        .filter(|e| !e.is_empty())
        .ok_or_else(|| "event is required and must be a string".to_string())?;
    if !is_known_event(&event) {
        return Err(format!(
            "Invalid event type. Must be one of: {}",
            ANALYTICS_EVENTS.join(", ")
        ));
    }
    let session_id = body
        .session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| "sessionId is required and must be a string".to_string())?;

    Ok(AnalyticsEvent {
        event,
        lens_id: body.lens_id.filter(|l| !l.is_empty()),
        session_id,
    })
}

pub(super) async fn record_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<RecordEventRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;
    let event =
        validate(body).map_err(|msg| ApiError::new(req_id.0.clone(), "validation_error", msg))?;

    let recorded = state
        .store
        .record_event(&event)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    tracing::debug!(event = %recorded.event, "analytics event recorded");

    Ok((
        StatusCode::CREATED,
        Json(EventRecorded {
            event: recorded,
            message: "Event tracked successfully",
        }),
    )
        .into_response())
}
