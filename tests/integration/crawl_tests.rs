//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::time::{Duration, Instant};
use url::Url;
use wavecrawl::config::{Config, CrawlerConfig, SessionConfig};
use wavecrawl::crawler::{
    FetchOutcome, FetchSession, HttpFetchSession, MultiDomainFetchSession, TransportErrorKind,
};
use wavecrawl::{crawl, CrawlBudget, Crawler, RejectReason, TitleAnalyzer};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short timeouts
fn create_test_config(max_urls: usize, max_depth: u32, max_concurrency: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_urls,
            max_depth,
            max_concurrency,
            priority_patterns: vec![],
        },
        session: SessionConfig {
            timeout_secs: 5,
            connect_timeout_secs: 2,
            user_agent: "TestBot/1.0".to_string(),
            ..SessionConfig::default()
        },
    }
}

fn html_page(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

fn titled(title: &str, anchors: &[&str]) -> String {
    let links: String = anchors
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, links
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Index links to both pages, one absolute and one relative
    mount_page(
        &mock_server,
        "/",
        titled("Home", &[&format!("{}/page1", base_url), "/page2"]),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        titled("Page 1", &["/page2", "https://external.example.org/elsewhere"]),
    )
    .await;
    mount_page(&mock_server, "/page2", titled("Page 2", &["/"])).await;

    let config = create_test_config(100, 3, 5);
    let mut crawler = Crawler::new(&config)
        .expect("Failed to create crawler")
        .with_analyzer(TitleAnalyzer);

    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 3, "Should have crawled 3 pages");
    assert!(results.iter().all(|r| r.fetch.is_success()));

    let mut titles: Vec<&str> = results
        .iter()
        .filter_map(|r| r.analysis.get("title").and_then(|v| v.as_str()))
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Home", "Page 1", "Page 2"]);

    let stats = crawler.stats();
    assert_eq!(stats.urls_found, 3);
    assert_eq!(stats.urls_processed, 3);
    assert_eq!(stats.success_rate, 100.0);
    assert_eq!(stats.urls_filtered.get(&RejectReason::CrossDomain), Some(&1));
    assert_eq!(stats.session.requests_made, 3);
}

#[tokio::test]
async fn test_noise_variants_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        titled(
            "Home",
            &["/a", "/a/", "/a?utm_source=newsletter", "/a#section", "//a"],
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page(titled("A", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(100, 3, 5);
    let mut crawler = Crawler::new(&config).expect("Failed to create crawler");
    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 2);
    assert!(crawler.stats().urls_duplicate >= 3);

    // Wiremock verifies expect(1) when the mock server drops
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Chain: / -> /level1 -> /level2 -> /level3
    mount_page(&mock_server, "/", titled("Root", &["/level1"])).await;
    mount_page(&mock_server, "/level1", titled("Level 1", &["/level2"])).await;
    mount_page(&mock_server, "/level2", titled("Level 2", &["/level3"])).await;

    Mock::given(method("GET"))
        .and(path("/level3"))
        .respond_with(html_page(titled("Level 3", &[])))
        .expect(0) // Should never be called with max_depth=2
        .mount(&mock_server)
        .await;

    let config = create_test_config(100, 2, 5);
    let mut crawler = Crawler::new(&config).expect("Failed to create crawler");
    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.fetch.depth <= 2));
}

#[tokio::test]
async fn test_budget_caps_results() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let paths: Vec<String> = (0..10).map(|i| format!("/item{}", i)).collect();
    let anchors: Vec<&str> = paths.iter().map(String::as_str).collect();
    mount_page(&mock_server, "/", titled("Index", &anchors)).await;

    Mock::given(method("GET"))
        .respond_with(html_page(titled("Item", &[])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(3, 3, 5);
    let mut crawler = Crawler::new(&config).expect("Failed to create crawler");
    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 3, "Budget of 3 URLs must not be exceeded");
    assert_eq!(crawler.stats().queue_depth, 8);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unreachable_seed_returns_single_error() {
    // Bind then drop a listener so the port is known to be closed
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let config = create_test_config(100, 3, 5);
    let mut crawler = Crawler::new(&config).expect("Failed to create crawler");
    let results = crawler
        .crawl(&format!("http://127.0.0.1:{}/", port))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0].fetch.outcome,
        FetchOutcome::Transport { .. }
    ));
    assert_eq!(crawler.stats().success_rate, 0.0);
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", titled("Home", &["/feed", "/missing"])).await;

    // JSON response containing something that looks like a link
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"html": "<a href=\"/hidden\">x</a>"}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html_page(titled("Hidden", &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(100, 3, 5);
    let mut crawler = Crawler::new(&config)
        .expect("Failed to create crawler")
        .with_analyzer(TitleAnalyzer);
    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 3);

    let feed = results
        .iter()
        .find(|r| r.fetch.requested_url.path() == "/feed")
        .expect("feed result");
    assert_eq!(feed.fetch.outcome, FetchOutcome::Http { status: 200 });
    assert!(feed.fetch.body.is_none());
    assert!(feed.fetch.links.is_empty());
    assert!(feed.analysis.is_empty());

    let missing = results
        .iter()
        .find(|r| r.fetch.requested_url.path() == "/missing")
        .expect("missing result");
    assert_eq!(missing.fetch.outcome, FetchOutcome::Http { status: 404 });
}

#[tokio::test]
async fn test_redirect_followed_and_links_resolved_from_final_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", titled("Home", &["/old"])).await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/new"))
        .mount(&mock_server)
        .await;

    // Relative link resolves to /docs/child only against the final URL
    mount_page(&mock_server, "/docs/new", titled("New", &["child"])).await;
    mount_page(&mock_server, "/docs/child", titled("Child", &[])).await;

    let config = create_test_config(100, 3, 5);
    let mut crawler = Crawler::new(&config).expect("Failed to create crawler");
    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    let old = results
        .iter()
        .find(|r| r.fetch.requested_url.path() == "/old")
        .expect("redirected result");
    assert!(old.fetch.redirected());
    assert_eq!(old.fetch.final_url.path(), "/docs/new");

    assert!(results
        .iter()
        .any(|r| r.fetch.requested_url.path() == "/docs/child"));
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestBot/1.0"))
        .and(header("x-crawl-run", "integration"))
        .respond_with(html_page(titled("Home", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(10, 2, 2);
    config
        .session
        .headers
        .insert("X-Crawl-Run".to_string(), "integration".to_string());

    let mut crawler = Crawler::new(&config).expect("Failed to create crawler");
    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 1);
    assert!(results[0].fetch.is_success());
}

#[tokio::test]
async fn test_rate_limited_crawl_is_paced() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", titled("Home", &["/a", "/b", "/c"])).await;
    for route in ["/a", "/b", "/c"] {
        mount_page(&mock_server, route, titled("Leaf", &[])).await;
    }

    let mut config = create_test_config(100, 3, 5);
    config.session.requests_per_second = Some(10.0);

    let mut crawler = Crawler::new(&config).expect("Failed to create crawler");
    let start = Instant::now();
    let results = crawler
        .crawl(&format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 4);
    // Four dispatches at 10/s need at least three 100ms gaps
    assert!(start.elapsed() >= Duration::from_millis(280));
}

#[tokio::test]
async fn test_free_crawl_function() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", titled("Home", &["/next"])).await;
    mount_page(&mock_server, "/next", titled("Next", &[])).await;

    let budget = CrawlBudget {
        max_urls: 10,
        max_depth: 1,
        max_concurrency: 2,
    };
    let results = crawl(&format!("{}/", base_url), budget)
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[1].fetch.depth, 1);
}

#[tokio::test]
async fn test_session_closed_after_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", titled("Home", &[])).await;

    let session = std::sync::Arc::new(
        HttpFetchSession::new(&create_test_config(10, 2, 2).session).expect("session"),
    );
    let shared: std::sync::Arc<dyn FetchSession> = session.clone();
    let budget = CrawlBudget {
        max_urls: 10,
        max_depth: 2,
        max_concurrency: 2,
    };

    let mut crawler = Crawler::with_session(budget, shared).expect("Failed to create crawler");
    crawler
        .crawl(&format!("{}/", mock_server.uri()))
        .await
        .expect("Crawl failed");

    assert!(session.is_closed());
    let after = session
        .fetch(&Url::parse(&mock_server.uri()).unwrap())
        .await;
    assert!(matches!(
        after.outcome,
        FetchOutcome::Transport {
            kind: TransportErrorKind::Closed,
            ..
        }
    ));
}

#[tokio::test]
async fn test_multi_domain_session_tracks_hosts() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", titled("Home", &[])).await;

    let port = mock_server.address().port();
    let session = MultiDomainFetchSession::new(create_test_config(10, 2, 2).session);

    let by_ip = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
    let by_name = Url::parse(&format!("http://localhost:{}/", port)).unwrap();

    assert!(session.fetch(&by_ip).await.is_success());
    assert!(session.fetch(&by_name).await.is_success());
    assert!(session.fetch(&by_ip).await.is_success());

    let stats = session.stats();
    assert_eq!(stats.requests_made, 3);
    assert_eq!(stats.domains_accessed(), 2);
    assert_eq!(stats.domains["127.0.0.1"].requests_made, 2);
    assert_eq!(stats.domains["localhost"].requests_made, 1);
    assert_eq!(stats.success_rate, 100.0);
}
