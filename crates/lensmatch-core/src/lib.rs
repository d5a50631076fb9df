pub mod alerts;
pub mod analytics;
pub mod app_config;
pub mod catalogue;
pub mod config;
pub mod prices;
pub mod shaping;

use thiserror::Error;

pub use alerts::{AlertSubscription, NewAlert};
pub use analytics::{is_known_event, AnalyticsEvent, RecordedEvent, ANALYTICS_EVENTS};
pub use app_config::{AppConfig, Environment};
pub use catalogue::{load_catalogue, Catalogue, Lens};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use prices::{Platform, PriceQuote, SnapshotObservation, SourceKind};
pub use shaping::{build_prices_response, HistoryPoint, PlatformPrice, PricesResponse};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalogue file {path}: {source}")]
    CatalogueIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalogue file: {0}")]
    CatalogueParse(#[source] serde_json::Error),

    #[error("catalogue validation failed: {0}")]
    Validation(String),
}
