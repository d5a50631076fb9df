//! Integration tests for `AffiliatePriceFetcher`.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no
//! real network traffic is made.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lensmatch_core::PriceQuote;
use lensmatch_scraper::{AffiliateCredentials, AffiliatePriceFetcher, PriceFetcher, ScraperError};

const SEARCH_PATH: &str = "/affiliate/1.0/search.json";

fn credentials() -> Option<AffiliateCredentials> {
    Some(AffiliateCredentials {
        affiliate_id: "testid".to_string(),
        token: "testtoken".to_string(),
    })
}

fn fetcher(server: &MockServer, credentials: Option<AffiliateCredentials>) -> AffiliatePriceFetcher {
    AffiliatePriceFetcher::new(server.uri(), credentials, 5)
        .expect("failed to build test AffiliatePriceFetcher")
}

#[tokio::test]
async fn sends_credentials_as_headers_and_returns_quote() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("query", "Nikon 50mm f/1.8G"))
        .and(query_param("resultCount", "10"))
        .and(header("Fk-Affiliate-Id", "testid"))
        .and(header("Fk-Affiliate-Token", "testtoken"))
        .and(header("User-Agent", "LensMatch-India/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [{
                "productBaseInfoV1": {
                    "sellingPrice": 29999,
                    "productUrl": "https://flipkart.com/nikon-50mm"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let quote = fetcher(&server, credentials())
        .fetch_price("Nikon 50mm f/1.8G", "nikon-50mm-f1-8g")
        .await;

    assert_eq!(
        quote,
        Some(PriceQuote {
            price: 29_999,
            url: "https://flipkart.com/nikon-50mm".to_string()
        })
    );
}

#[tokio::test]
async fn returns_minimum_priced_candidate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                {"productBaseInfoV1": {"sellingPrice": {"amount": 31500}, "productUrl": "https://fk/a"}},
                {"productBaseInfoV1": {"sellingPrice": {"amount": 30800}, "productUrl": "https://fk/b"}}
            ]
        })))
        .mount(&server)
        .await;

    let quote = fetcher(&server, credentials())
        .fetch_price("Sony FE 50mm", "sony")
        .await
        .expect("quote");
    assert_eq!(quote.price, 30_800);
    assert_eq!(quote.url, "https://fk/b");
}

#[tokio::test]
async fn missing_credentials_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, None);
    assert!(!fetcher.is_configured());
    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert!(matches!(
        fetcher.search("Nikon 50mm").await,
        Err(ScraperError::MissingCredentials)
    ));
}

#[tokio::test]
async fn non_200_is_absence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, credentials());
    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert!(matches!(
        fetcher.search("Nikon 50mm").await,
        Err(ScraperError::UnexpectedStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn body_without_product_list_is_absence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, credentials());
    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert!(matches!(fetcher.search("Nikon 50mm").await, Ok(None)));
}

#[tokio::test]
async fn malformed_json_is_absence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, credentials());
    assert!(fetcher.fetch_price("Nikon 50mm", "nk-50").await.is_none());
    assert!(matches!(
        fetcher.search("Nikon 50mm").await,
        Err(ScraperError::Deserialize { .. })
    ));
}

#[tokio::test]
async fn slow_response_times_out_as_absence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"products": []}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let fetcher = AffiliatePriceFetcher::new(server.uri(), credentials(), 1).expect("client");
    assert!(matches!(
        fetcher.search("Nikon 50mm").await,
        Err(ScraperError::Http(_))
    ));
}
