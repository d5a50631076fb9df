//! Database operations for `analytics_events`.

use chrono::{DateTime, Utc};
use lensmatch_core::RecordedEvent;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalyticsEventRow {
    pub id: i64,
    pub event: String,
    pub lens_id: Option<String>,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<AnalyticsEventRow> for RecordedEvent {
    fn from(row: AnalyticsEventRow) -> Self {
        Self {
            id: row.id,
            event: row.event,
            lens_id: row.lens_id,
            session_id: row.session_id,
            created_at: row.created_at,
        }
    }
}

/// Records one client-side analytics event.
///
/// The event name is not checked here; callers validate it against the
/// accepted list first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_analytics_event(
    pool: &PgPool,
    event: &str,
    lens_id: Option<&str>,
    session_id: &str,
) -> Result<AnalyticsEventRow, DbError> {
    let row = sqlx::query_as::<_, AnalyticsEventRow>(
        "INSERT INTO analytics_events (event, lens_id, session_id) \
         VALUES ($1, $2, $3) \
         RETURNING id, event, lens_id, session_id, created_at",
    )
    .bind(event)
    .bind(lens_id)
    .bind(session_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
