use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing required email field: {0}")]
    MissingField(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail transport rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
