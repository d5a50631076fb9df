use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::*;

const SONY_PAGE: &str = r#"<html><body>
    <div data-component-type="s-search-result">
      <span class="s-sponsored-label-text">Sponsored</span>
      <a class="a-link-normal s-no-outline" href="/Ad-Lens/dp/B0AD">ad</a>
      <span class="a-price-whole">19,999</span>
    </div>
    <div data-component-type="s-search-result">
      <a class="a-link-normal s-no-outline" href="/Sony-FE-50mm-F1-8/dp/B01N0BK3AI">Sony</a>
      <span class="a-price-whole">31,200.</span>
    </div>
  </body></html>"#;

#[derive(Default)]
struct Counters {
    launches: AtomicU32,
    navigations: AtomicU32,
    waits: AtomicU32,
    closes: AtomicU32,
    user_agents: Mutex<Vec<String>>,
}

#[derive(Clone, Copy)]
enum Script {
    /// Every step succeeds and serves `SONY_PAGE`.
    Succeeds,
    /// The result container never appears.
    SelectorTimesOut,
    /// First `n` navigations fail, later ones succeed.
    NavigationFailsFirst(u32),
    /// Page loads but has no organic results.
    OnlySponsored,
    /// Launch itself fails.
    LaunchFails,
    /// `content()` panics.
    Panics,
}

struct FakeLauncher {
    script: Script,
    counters: Arc<Counters>,
}

struct FakeSession {
    script: Script,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, user_agent: &str) -> Result<Box<dyn BrowserSession>, ScraperError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        self.counters
            .user_agents
            .lock()
            .unwrap()
            .push(user_agent.to_string());
        if matches!(self.script, Script::LaunchFails) {
            return Err(ScraperError::BrowserLaunch("no chrome".to_string()));
        }
        Ok(Box::new(FakeSession {
            script: self.script,
            counters: Arc::clone(&self.counters),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<(), ScraperError> {
        let n = self.counters.navigations.fetch_add(1, Ordering::SeqCst) + 1;
        match self.script {
            Script::NavigationFailsFirst(failures) if n <= failures => Err(
                ScraperError::browser("navigate", "net::ERR_CONNECTION_RESET"),
            ),
            _ => Ok(()),
        }
    }

    async fn wait_for_selector(
        &self,
        _selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        self.counters.waits.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::SelectorTimesOut => Err(ScraperError::Timeout {
                stage: "wait_for_results",
                secs: timeout.as_secs(),
            }),
            _ => Ok(()),
        }
    }

    async fn content(&self) -> Result<String, ScraperError> {
        match self.script {
            Script::OnlySponsored => Ok(r#"<div data-component-type="s-search-result">
                <div data-component-type="s-ad-result"></div>
                <a class="a-link-normal s-no-outline" href="/x/dp/B0X">x</a>
                <span class="a-price-whole">100</span></div>"#
                .to_string()),
            Script::Panics => panic!("renderer crashed"),
            _ => Ok(SONY_PAGE.to_string()),
        }
    }

    async fn close(self: Box<Self>) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn instant_config() -> RetailFetcherConfig {
    RetailFetcherConfig {
        base_url: "https://www.amazon.in".to_string(),
        nav_timeout: Duration::from_secs(30),
        selector_timeout: Duration::from_secs(10),
        max_attempts: 3,
        retry_pause: Duration::ZERO,
        settle_delay_min: Duration::ZERO,
        settle_delay_max: Duration::ZERO,
    }
}

fn production_config() -> RetailFetcherConfig {
    let app_config = lensmatch_core::build_app_config(|key| match key {
        "DATABASE_URL" => Ok("postgres://localhost/lensmatch".to_string()),
        _ => Err(std::env::VarError::NotPresent),
    })
    .expect("default config");
    RetailFetcherConfig::from_app_config(&app_config)
}

fn fetcher_with(script: Script, config: RetailFetcherConfig) -> (RetailPriceFetcher, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let launcher = FakeLauncher {
        script,
        counters: Arc::clone(&counters),
    };
    (RetailPriceFetcher::new(Arc::new(launcher), config), counters)
}

fn fetcher(script: Script) -> (RetailPriceFetcher, Arc<Counters>) {
    fetcher_with(script, instant_config())
}

#[tokio::test]
async fn returns_extracted_quote_and_closes_once() {
    let (fetcher, counters) = fetcher(Script::Succeeds);

    let quote = fetcher
        .fetch_price("Sony FE 50mm f/1.8", "sony-fe-50mm-f1-8")
        .await
        .expect("quote");

    assert_eq!(
        quote,
        PriceQuote {
            price: 31_200,
            url: "https://www.amazon.in/Sony-FE-50mm-F1-8/dp/B01N0BK3AI".to_string(),
        }
    );
    assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
    assert_eq!(counters.navigations.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn selector_timeouts_exhaust_exactly_three_attempts() {
    let (fetcher, counters) = fetcher(Script::SelectorTimesOut);

    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert_eq!(counters.waits.load(Ordering::SeqCst), 3);
    // One session reused across attempts.
    assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn recovers_after_transient_navigation_failures() {
    let (fetcher, counters) = fetcher(Script::NavigationFailsFirst(2));

    let quote = fetcher.fetch_price("Sony FE 50mm", "sony").await;
    assert_eq!(quote.map(|q| q.price), Some(31_200));
    assert_eq!(counters.navigations.load(Ordering::SeqCst), 3);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_organic_result_is_absence() {
    let (fetcher, counters) = fetcher(Script::OnlySponsored);

    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn launch_failure_is_absence_without_close() {
    let (fetcher, counters) = fetcher(Script::LaunchFails);

    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert_eq!(counters.navigations.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panic_inside_attempt_still_closes_session() {
    let (fetcher, counters) = fetcher(Script::Panics);

    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn launches_with_pooled_user_agent() {
    let (fetcher, counters) = fetcher(Script::Succeeds);
    fetcher.fetch_price("Nikon 50mm", "nk-50").await;

    let agents = counters.user_agents.lock().unwrap();
    assert_eq!(agents.len(), 1);
    assert!(crate::user_agent::USER_AGENTS.contains(&agents[0].as_str()));
}

#[tokio::test(start_paused = true)]
async fn failed_attempts_pause_two_seconds_between_but_not_after_last() {
    let config = RetailFetcherConfig {
        settle_delay_min: Duration::ZERO,
        settle_delay_max: Duration::ZERO,
        ..production_config()
    };
    assert_eq!(config.retry_pause, Duration::from_secs(2));
    let (fetcher, counters) = fetcher_with(Script::SelectorTimesOut, config);

    let started = tokio::time::Instant::now();
    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());

    assert_eq!(counters.waits.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn settle_pause_precedes_dom_read() {
    let (fetcher, _) = fetcher_with(Script::Succeeds, production_config());

    let started = tokio::time::Instant::now();
    assert!(fetcher.fetch_price("Sony FE 50mm", "sony").await.is_some());

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(5), "elapsed {elapsed:?}");
}

#[test]
fn settle_delay_stays_within_two_to_five_seconds() {
    let (fetcher, _) = fetcher_with(Script::Succeeds, production_config());
    for _ in 0..500 {
        let delay = fetcher.settle_delay();
        assert!(
            (Duration::from_secs(2)..=Duration::from_secs(5)).contains(&delay),
            "delay {delay:?}"
        );
    }
}

#[test]
fn search_url_encodes_name() {
    let (fetcher, _) = fetcher(Script::Succeeds);
    assert_eq!(
        fetcher.search_url("Sony FE 50mm f/1.8"),
        "https://www.amazon.in/s?k=Sony%20FE%2050mm%20f%2F1%2E8"
    );
}
