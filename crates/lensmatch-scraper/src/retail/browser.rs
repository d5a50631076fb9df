//! Headless browser seam for the retail fetcher.
//!
//! [`BrowserLauncher`] / [`BrowserSession`] are the only things the fetcher
//! knows about a browser. [`ChromiumLauncher`] drives a real Chromium over
//! CDP via `chromiumoxide`; tests substitute scripted sessions.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::error::ScraperError;

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 720;
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Resource count must hold steady for this many polls to count as settled.
const NETWORK_QUIET_POLLS: u32 = 2;
/// Longest the network-settle wait may run past the load event.
const NETWORK_SETTLE_MAX: Duration = Duration::from_secs(5);
const RESOURCE_COUNT_JS: &str = "performance.getEntriesByType('resource').length";
/// Upper bound for each of the graceful close and the process exit wait.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts one isolated browser session per fetch call.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, ScraperError>;
}

/// A single open page. Reused across the attempts of one fetch call.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Loads `url`, waits for the load event and then for network activity to
    /// settle.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// Waits until `selector` matches at least one element.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), ScraperError>;

    /// Returns the rendered document markup.
    async fn content(&self) -> Result<String, ScraperError>;

    /// Tears the session down. Errors are logged, not returned.
    async fn close(self: Box<Self>);
}

/// Launches a headless Chromium per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }

    fn browser_config(&self, user_agent: &str) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={user_agent}"))
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            });

        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(ScraperError::BrowserLaunch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, ScraperError> {
        let config = self.browser_config(user_agent)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        match browser.new_page("about:blank").await {
            Ok(page) => Ok(Box::new(ChromiumSession {
                browser,
                page,
                handler_task,
            })),
            Err(e) => {
                teardown(&mut browser, TEARDOWN_TIMEOUT).await;
                handler_task.abort();
                Err(ScraperError::BrowserLaunch(e.to_string()))
            }
        }
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

/// Tracks successive resource counts; settled once the count has held for
/// [`NETWORK_QUIET_POLLS`] polls in a row.
#[derive(Debug, Default)]
struct NetworkQuiet {
    last: Option<u64>,
    quiet_polls: u32,
}

impl NetworkQuiet {
    fn observe(&mut self, count: Option<u64>) -> bool {
        if count.is_some() && count == self.last {
            self.quiet_polls += 1;
        } else {
            self.quiet_polls = 0;
            self.last = count;
        }
        self.quiet_polls >= NETWORK_QUIET_POLLS
    }
}

impl ChromiumSession {
    /// Polls the page's resource-timing count until it stops growing.
    async fn wait_for_network_quiet(&self) {
        let mut quiet = NetworkQuiet::default();
        loop {
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            let count = match self.page.evaluate(RESOURCE_COUNT_JS).await {
                Ok(result) => result.into_value::<u64>().ok(),
                Err(e) => {
                    tracing::debug!(error = %e, "resource count unavailable");
                    return;
                }
            };
            if quiet.observe(count) {
                return;
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        tokio::time::timeout(timeout, self.page.goto(NavigateParams::new(url)))
            .await
            .map_err(|_| ScraperError::Timeout {
                stage: "navigate",
                secs: timeout.as_secs(),
            })?
            .map_err(|e| ScraperError::browser("navigate", e))?;

        // `goto` resolves on the load event; late XHR traffic is still in
        // flight. Pages that never go quiet (ad beacons) proceed after the cap.
        if tokio::time::timeout(NETWORK_SETTLE_MAX, self.wait_for_network_quiet())
            .await
            .is_err()
        {
            tracing::debug!(url, "network still busy after settle cap");
        }
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let poll = async {
            while self.page.find_element(selector).await.is_err() {
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ScraperError::Timeout {
                stage: "wait_for_results",
                secs: timeout.as_secs(),
            })
    }

    async fn content(&self) -> Result<String, ScraperError> {
        self.page
            .content()
            .await
            .map_err(|e| ScraperError::browser("content", e))
    }

    async fn close(self: Box<Self>) {
        let ChromiumSession {
            mut browser,
            page: _,
            handler_task,
        } = *self;

        teardown(&mut browser, TEARDOWN_TIMEOUT).await;
        handler_task.abort();
    }
}

/// The process-level operations teardown needs from a running browser.
#[async_trait]
trait BrowserProcess: Send {
    /// Asks the browser to exit over CDP.
    async fn request_close(&mut self) -> Result<(), ScraperError>;
    /// Waits for the child process to exit.
    async fn wait_exit(&mut self) -> Result<(), ScraperError>;
    /// Kills the child process.
    async fn kill(&mut self);
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> Result<(), ScraperError> {
        self.close()
            .await
            .map(|_| ())
            .map_err(|e| ScraperError::browser("close", e))
    }

    async fn wait_exit(&mut self) -> Result<(), ScraperError> {
        self.wait()
            .await
            .map(|_| ())
            .map_err(|e| ScraperError::browser("wait", e))
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = Browser::kill(self).await {
            tracing::warn!(error = %e, "browser kill failed");
        }
    }
}

/// Graceful close, then wait for exit; kill the process if either step fails
/// or exceeds `deadline`. Never waits on a process that was not asked to exit.
async fn teardown(process: &mut impl BrowserProcess, deadline: Duration) {
    match tokio::time::timeout(deadline, process.request_close()).await {
        Ok(Ok(())) => match tokio::time::timeout(deadline, process.wait_exit()).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => tracing::warn!(error = %e, "browser exit wait failed; killing"),
            Err(_) => tracing::warn!("browser did not exit in time; killing"),
        },
        Ok(Err(e)) => tracing::warn!(error = %e, "browser close failed; killing"),
        Err(_) => tracing::warn!("browser close timed out; killing"),
    }
    process.kill().await;
}
