use lensmatch_db::DbError;
use lensmatch_notify::NotifyError;
use lensmatch_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("refusing to store non-positive price {0}")]
    InvalidPrice(i64),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown lens '{0}'")]
    UnknownLens(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to build price fetcher: {0}")]
    Fetcher(#[from] ScraperError),
    #[error("failed to build mailer: {0}")]
    Mailer(#[from] NotifyError),
}
