use std::sync::LazyLock;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use lensmatch_core::NewAlert;
use lensmatch_notify::escape_html;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{map_store_error, ApiError, AppState};
use crate::middleware::RequestId;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Largest value `NUMERIC(12,2)` holds.
const MAX_TARGET_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateAlertRequest {
    email: Option<String>,
    lens_id: Option<String>,
    target_price: Option<serde_json::Number>,
    consent: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AlertCreated {
    id: i64,
    email: String,
    lens_id: String,
    target_price: Decimal,
    consent: bool,
    unsubscribe_token: Uuid,
    created_at: DateTime<Utc>,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct UnsubscribeParams {
    token: Option<String>,
}

fn validate(body: CreateAlertRequest) -> Result<NewAlert, &'static str> {
    let email = body
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| EMAIL_RE.is_match(e))
        .ok_or("Valid email is required")?;
    let lens_id = body
        .lens_id
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .ok_or("lensId is required")?;
    let target_price = body
        .target_price
        .as_ref()
        .and_then(number_to_decimal)
        .filter(|p| *p > Decimal::ZERO)
        .ok_or("targetPrice must be a positive number")?;
    if target_price > MAX_TARGET_PRICE {
        return Err("targetPrice is too large");
    }
    let consent = body.consent.ok_or("consent must be a boolean")?;

    Ok(NewAlert {
        email,
        lens_id,
        target_price,
        consent,
    })
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    n.as_f64()
        .and_then(|f| Decimal::try_from(f).ok())
        .map(|d| d.round_dp(2))
}

pub(super) async fn create_alert(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;
    let alert =
        validate(body).map_err(|msg| ApiError::new(req_id.0.clone(), "validation_error", msg))?;

    let subscription = state
        .store
        .upsert_alert(&alert)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    tracing::info!(alert_id = subscription.id, lens_id = %subscription.lens_id, "price alert saved");

    let created = AlertCreated {
        id: subscription.id,
        email: subscription.email,
        lens_id: subscription.lens_id,
        target_price: subscription.target_price,
        consent: subscription.consent,
        unsubscribe_token: subscription.unsubscribe_token,
        created_at: subscription.created_at,
        message: "Alert created successfully",
    };
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub(super) async fn unsubscribe(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<UnsubscribeParams>,
) -> Result<Html<String>, ApiError> {
    let Some(raw) = params.token.filter(|t| !t.trim().is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "Unsubscribe token is required",
        ));
    };

    let not_found = || {
        ApiError::new(
            req_id.0.clone(),
            "not_found",
            "Alert not found or already unsubscribed",
        )
    };

    let token = Uuid::parse_str(raw.trim()).map_err(|_| not_found())?;
    let removed = state
        .store
        .unsubscribe(token)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?
        .ok_or_else(not_found)?;
    tracing::info!(alert_id = removed.id, lens_id = %removed.lens_id, "price alert unsubscribed");

    Ok(Html(unsubscribed_page(&removed.lens_id, &removed.email)))
}

fn unsubscribed_page(lens_id: &str, email: &str) -> String {
    let lens_id = escape_html(lens_id);
    let email = escape_html(email);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Unsubscribed - LensMatch India</title>
  <style>
    body {{ font-family: Arial, sans-serif; background: #f5f5f5; padding: 40px 20px; }}
    .container {{ max-width: 500px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }}
    h1 {{ color: #333; margin: 0 0 10px 0; }}
    p {{ color: #666; line-height: 1.6; }}
    .success {{ color: #27ae60; font-weight: bold; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>Unsubscribed Successfully</h1>
    <p class="success">You have been unsubscribed from price alerts for lens <strong>{lens_id}</strong></p>
    <p>Your email <strong>{email}</strong> will no longer receive notifications.</p>
    <p>If you change your mind, you can subscribe again anytime from our website.</p>
  </div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: serde_json::Value) -> CreateAlertRequest {
        serde_json::from_value(serde_json::json!({
            "email": "buyer@example.com",
            "lensId": "sony-fe-50",
            "targetPrice": target,
            "consent": true
        }))
        .expect("request parses")
    }

    #[test]
    fn accepts_integer_and_fractional_targets() {
        assert_eq!(
            validate(request(serde_json::json!(30000))).unwrap().target_price,
            Decimal::from(30_000)
        );
        assert_eq!(
            validate(request(serde_json::json!(29999.5))).unwrap().target_price,
            Decimal::new(2_999_950, 2)
        );
    }

    #[test]
    fn rejects_non_positive_and_oversized_targets() {
        assert!(validate(request(serde_json::json!(0))).is_err());
        assert!(validate(request(serde_json::json!(-10))).is_err());
        assert_eq!(
            validate(request(serde_json::json!(100_000_000_000_i64))).unwrap_err(),
            "targetPrice is too large"
        );
    }

    #[test]
    fn max_target_matches_column_precision() {
        assert_eq!(MAX_TARGET_PRICE.to_string(), "9999999999.99");
    }

    #[test]
    fn rejects_bad_email() {
        let mut body = request(serde_json::json!(100));
        body.email = Some("not-an-email".to_string());
        assert_eq!(validate(body).unwrap_err(), "Valid email is required");
    }

    #[test]
    fn unsubscribe_page_escapes_values() {
        let page = unsubscribed_page("<b>lens</b>", "a&b@example.com");
        assert!(page.contains("&lt;b&gt;lens&lt;/b&gt;"));
        assert!(page.contains("a&amp;b@example.com"));
    }
}
