use thiserror::Error;

/// Failures inside a fetch. Fetchers log these and return `None`; they never
/// reach callers of [`crate::PriceFetcher::fetch_price`].
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("affiliate credentials are not configured")]
    MissingCredentials,

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("browser error during {stage}: {reason}")]
    Browser { stage: &'static str, reason: String },

    #[error("timed out after {secs}s during {stage}")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("no eligible non-sponsored result on {url}")]
    NoEligibleResult { url: String },
}

impl ScraperError {
    /// Wraps a browser-driver failure with the stage it happened in.
    pub fn browser(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Browser {
            stage,
            reason: err.to_string(),
        }
    }
}
