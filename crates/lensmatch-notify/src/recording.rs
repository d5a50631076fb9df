//! In-memory transport for tests in this and downstream crates.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::mailer::Mailer;
use crate::template::PriceAlertEmail;

/// Keeps every accepted email in memory. Recipients listed via
/// [`RecordingMailer::fail_for`] are rejected.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<PriceAlertEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sends to `recipient` fail until [`RecordingMailer::recover`].
    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(recipient.to_string());
        }
    }

    pub fn recover(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(recipient);
        }
    }

    #[must_use]
    pub fn sent(&self) -> Vec<PriceAlertEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_price_alert(&self, email: &PriceAlertEmail) -> Result<(), NotifyError> {
        email.validate()?;

        let should_fail = self
            .failing
            .lock()
            .map(|f| f.contains(&email.to))
            .unwrap_or(false);
        if should_fail {
            return Err(NotifyError::Rejected {
                status: 503,
                body: "recipient temporarily rejected".to_string(),
            });
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}
