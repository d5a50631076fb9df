//! Converts stored snapshots into the `/api/prices/{lensId}` response shape.
//!
//! Pure functions only; callers fetch the rows.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::prices::{Platform, SnapshotObservation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPrice {
    pub price: i64,
    pub url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One point of the daily price history. `date` serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricesResponse {
    pub amazon: Option<PlatformPrice>,
    pub flipkart: Option<PlatformPrice>,
    pub history: Vec<HistoryPoint>,
}

/// Builds the prices response from the latest-per-platform rows and the
/// trailing-window history rows.
///
/// A platform is `None` unless it has a positive-priced observation. When
/// `latest` holds several rows for one platform, the most recent wins.
/// History keeps one entry per UTC calendar day (the latest observation of
/// that day, across platforms) and is sorted by date ascending.
#[must_use]
pub fn build_prices_response(
    latest: &[SnapshotObservation],
    history: &[SnapshotObservation],
) -> PricesResponse {
    PricesResponse {
        amazon: latest_for(latest, Platform::Amazon),
        flipkart: latest_for(latest, Platform::Flipkart),
        history: daily_history(history),
    }
}

fn latest_for(rows: &[SnapshotObservation], platform: Platform) -> Option<PlatformPrice> {
    rows.iter()
        .filter(|r| r.platform == platform && r.price > 0)
        .max_by_key(|r| r.observed_at)
        .map(|r| PlatformPrice {
            price: r.price,
            url: r.url.clone(),
            updated_at: r.observed_at,
        })
}

fn daily_history(rows: &[SnapshotObservation]) -> Vec<HistoryPoint> {
    let mut by_day: BTreeMap<NaiveDate, &SnapshotObservation> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.price > 0) {
        let day = row.observed_at.date_naive();
        by_day
            .entry(day)
            .and_modify(|kept| {
                if row.observed_at > kept.observed_at {
                    *kept = row;
                }
            })
            .or_insert(row);
    }

    by_day
        .into_iter()
        .map(|(date, row)| HistoryPoint {
            date,
            price: row.price,
        })
        .collect()
}
