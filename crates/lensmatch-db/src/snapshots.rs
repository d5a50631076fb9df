//! Database operations for the append-only `price_snapshots` table.

use chrono::{DateTime, Utc};
use lensmatch_core::{Platform, SnapshotObservation, SourceKind};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `price_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceSnapshotRow {
    pub id: i64,
    pub lens_id: String,
    /// `"amazon"` or `"flipkart"`; enforced by a CHECK constraint.
    pub platform: String,
    pub price: i64,
    pub url: Option<String>,
    /// `"scraped"` or `"api"`.
    pub source_type: String,
    pub created_at: DateTime<Utc>,
}

impl PriceSnapshotRow {
    /// Converts the row into the domain observation type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if `platform` or `source_type` holds
    /// a value the domain does not know.
    pub fn into_observation(self) -> Result<SnapshotObservation, DbError> {
        let platform = self
            .platform
            .parse::<Platform>()
            .map_err(|_| DbError::InvalidColumn {
                column: "platform",
                value: self.platform.clone(),
            })?;
        let source_kind =
            self.source_type
                .parse::<SourceKind>()
                .map_err(|_| DbError::InvalidColumn {
                    column: "source_type",
                    value: self.source_type.clone(),
                })?;

        Ok(SnapshotObservation {
            lens_id: self.lens_id,
            platform,
            price: self.price,
            url: self.url,
            source_kind,
            observed_at: self.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// price_snapshots operations
// ---------------------------------------------------------------------------

/// Appends one price observation. The row is never updated afterwards.
///
/// `created_at` is assigned by the database at insert time.
///
/// # Errors
///
/// Returns [`DbError::NonPositivePrice`] without touching the database when
/// `price <= 0`, or [`DbError::Sqlx`] if the insert fails.
pub async fn insert_price_snapshot(
    pool: &PgPool,
    lens_id: &str,
    platform: Platform,
    price: i64,
    url: Option<&str>,
) -> Result<PriceSnapshotRow, DbError> {
    if price <= 0 {
        return Err(DbError::NonPositivePrice(price));
    }

    let row = sqlx::query_as::<_, PriceSnapshotRow>(
        "INSERT INTO price_snapshots (lens_id, platform, price, url, source_type) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, lens_id, platform, price, url, source_type, created_at",
    )
    .bind(lens_id)
    .bind(platform.as_str())
    .bind(price)
    .bind(url)
    .bind(platform.source_kind().as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent snapshot per platform for a lens (at most one row
/// per platform).
///
/// Ties on `created_at` resolve to the higher `id`, i.e. the later insert.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_latest_per_platform(
    pool: &PgPool,
    lens_id: &str,
) -> Result<Vec<PriceSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceSnapshotRow>(
        "SELECT DISTINCT ON (platform) \
                id, lens_id, platform, price, url, source_type, created_at \
         FROM price_snapshots \
         WHERE lens_id = $1 \
         ORDER BY platform, created_at DESC, id DESC",
    )
    .bind(lens_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns all snapshots for a lens observed within the trailing
/// `window_days`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_price_history(
    pool: &PgPool,
    lens_id: &str,
    window_days: i32,
) -> Result<Vec<PriceSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceSnapshotRow>(
        "SELECT id, lens_id, platform, price, url, source_type, created_at \
         FROM price_snapshots \
         WHERE lens_id = $1 \
           AND created_at >= NOW() - make_interval(days => $2) \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(lens_id)
    .bind(window_days)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
