use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub catalogue_path: PathBuf,
    /// Origin used to build unsubscribe links, e.g. `https://api.lensmatch.in`.
    pub public_base_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub affiliate_id: Option<String>,
    pub affiliate_token: Option<String>,
    pub affiliate_base_url: String,
    pub affiliate_timeout_secs: u64,
    pub retail_base_url: String,
    pub scraper_nav_timeout_secs: u64,
    pub scraper_selector_timeout_secs: u64,
    pub scraper_max_attempts: u32,
    pub scraper_retry_pause_ms: u64,
    pub chrome_path: Option<PathBuf>,
    pub batch_pacing_ms: u64,
    pub refresh_cooldown_secs: u64,
    /// Take client identity from `X-Forwarded-For`. Only safe behind a proxy
    /// that overwrites the header.
    pub trust_proxy: bool,
    pub scheduler_enabled: bool,
    /// Six-field cron expressions (seconds first), evaluated in UTC.
    pub price_refresh_crons: Vec<String>,
    pub brevo_api_key: Option<String>,
    pub mail_from_email: Option<String>,
    pub mail_from_name: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("catalogue_path", &self.catalogue_path)
            .field("public_base_url", &self.public_base_url)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "affiliate_id",
                &self.affiliate_id.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "affiliate_token",
                &self.affiliate_token.as_ref().map(|_| "[redacted]"),
            )
            .field("affiliate_base_url", &self.affiliate_base_url)
            .field("affiliate_timeout_secs", &self.affiliate_timeout_secs)
            .field("retail_base_url", &self.retail_base_url)
            .field("scraper_nav_timeout_secs", &self.scraper_nav_timeout_secs)
            .field(
                "scraper_selector_timeout_secs",
                &self.scraper_selector_timeout_secs,
            )
            .field("scraper_max_attempts", &self.scraper_max_attempts)
            .field("scraper_retry_pause_ms", &self.scraper_retry_pause_ms)
            .field("chrome_path", &self.chrome_path)
            .field("batch_pacing_ms", &self.batch_pacing_ms)
            .field("refresh_cooldown_secs", &self.refresh_cooldown_secs)
            .field("trust_proxy", &self.trust_proxy)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("price_refresh_crons", &self.price_refresh_crons)
            .field(
                "brevo_api_key",
                &self.brevo_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("mail_from_email", &self.mail_from_email)
            .field("mail_from_name", &self.mail_from_name)
            .finish()
    }
}
