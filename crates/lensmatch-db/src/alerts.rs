//! Database operations for `price_alerts`.

use chrono::{DateTime, Utc};
use lensmatch_core::{AlertSubscription, NewAlert};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const ALERT_COLUMNS: &str =
    "id, email, lens_id, target_price, consent, unsubscribe_token, triggered_at, created_at";

/// A row from the `price_alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRow {
    pub id: i64,
    pub email: String,
    pub lens_id: String,
    pub target_price: Decimal,
    pub consent: bool,
    pub unsubscribe_token: Uuid,
    /// `NULL` while the subscription is armed.
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<AlertRow> for AlertSubscription {
    fn from(row: AlertRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            lens_id: row.lens_id,
            target_price: row.target_price,
            consent: row.consent,
            unsubscribe_token: row.unsubscribe_token,
            triggered_at: row.triggered_at,
            created_at: row.created_at,
        }
    }
}

/// Creates or re-arms the subscription for `(email, lens_id)`.
///
/// On conflict the target, consent and token are replaced and
/// `triggered_at` is cleared, so a re-subscription always re-arms.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_alert(
    pool: &PgPool,
    alert: &NewAlert,
    unsubscribe_token: Uuid,
) -> Result<AlertRow, DbError> {
    let sql = format!(
        "INSERT INTO price_alerts (email, lens_id, target_price, consent, unsubscribe_token) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (email, lens_id) DO UPDATE SET \
             target_price      = EXCLUDED.target_price, \
             consent           = EXCLUDED.consent, \
             unsubscribe_token = EXCLUDED.unsubscribe_token, \
             triggered_at      = NULL \
         RETURNING {ALERT_COLUMNS}"
    );

    let row = sqlx::query_as::<_, AlertRow>(&sql)
        .bind(&alert.email)
        .bind(&alert.lens_id)
        .bind(alert.target_price)
        .bind(alert.consent)
        .bind(unsubscribe_token)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Lists armed subscriptions (consented, not yet triggered) for a lens.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_armed_alerts(pool: &PgPool, lens_id: &str) -> Result<Vec<AlertRow>, DbError> {
    let sql = format!(
        "SELECT {ALERT_COLUMNS} \
         FROM price_alerts \
         WHERE lens_id = $1 AND consent AND triggered_at IS NULL \
         ORDER BY id"
    );

    let rows = sqlx::query_as::<_, AlertRow>(&sql)
        .bind(lens_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Marks a subscription triggered.
///
/// Only an armed row is updated; returns `false` if the row was already
/// triggered or no longer exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_alert_triggered(pool: &PgPool, alert_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE price_alerts SET triggered_at = NOW() \
         WHERE id = $1 AND triggered_at IS NULL",
    )
    .bind(alert_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Deletes the subscription owning `token`, returning it if one existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_alert_by_token(pool: &PgPool, token: Uuid) -> Result<Option<AlertRow>, DbError> {
    let sql = format!(
        "DELETE FROM price_alerts WHERE unsubscribe_token = $1 RETURNING {ALERT_COLUMNS}"
    );

    let row = sqlx::query_as::<_, AlertRow>(&sql)
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}
