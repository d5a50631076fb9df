pub mod error;
pub mod mailer;
#[cfg(any(test, feature = "test-support"))]
pub mod recording;
pub mod template;

pub use error::NotifyError;
pub use mailer::{
    mailer_from_app_config, BrevoMailer, LogMailer, Mailer, Sender, BREVO_API_BASE_URL,
};
#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingMailer;
pub use template::{
    escape_html, format_inr, render_price_alert, unsubscribe_url, PriceAlertEmail, RenderedEmail,
};
