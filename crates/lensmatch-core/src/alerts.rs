//! Price-alert subscription types.
//!
//! A subscription is **armed** while `triggered_at` is `None` and consent is
//! given, and **triggered** once a notification has gone out. Only an explicit
//! re-subscription re-arms it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSubscription {
    pub id: i64,
    pub email: String,
    pub lens_id: String,
    pub target_price: Decimal,
    pub consent: bool,
    pub unsubscribe_token: Uuid,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AlertSubscription {
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.consent && self.triggered_at.is_none()
    }

    /// `true` when an observed price is at or below the target.
    #[must_use]
    pub fn is_met_by(&self, price: i64) -> bool {
        Decimal::from(price) <= self.target_price
    }
}

/// Validated input for the subscribe/re-subscribe upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub email: String,
    pub lens_id: String,
    pub target_price: Decimal,
    pub consent: bool,
}
