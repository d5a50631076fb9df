use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client events accepted by the analytics endpoint.
pub const ANALYTICS_EVENTS: [&str; 7] = [
    "quiz_start",
    "quiz_complete",
    "lens_view",
    "catalogue_filter",
    "rent_city_select",
    "alert_signup",
    "price_refresh",
];

#[must_use]
pub fn is_known_event(event: &str) -> bool {
    ANALYTICS_EVENTS.contains(&event)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event: String,
    pub lens_id: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEvent {
    pub id: i64,
    pub event: String,
    pub lens_id: Option<String>,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_events_are_exact_matches() {
        assert!(is_known_event("quiz_complete"));
        assert!(!is_known_event("QUIZ_COMPLETE"));
        assert!(!is_known_event("page_view"));
    }
}
