//! End-to-end test against a real Chromium
//!
//! Requires a Chromium binary (see `SUMI_MIRROR_CHROMIUM`); run with
//! `cargo test -- --ignored`.

use sumi_mirror::browser::chromium::ChromiumBrowser;
use sumi_mirror::browser::Browser;
use sumi_mirror::config::BrowserSettings;
use sumi_mirror::crawler::{run_crawl, CrawlOptions, CrawlOutcome};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount(server: &MockServer, route: &str, mime: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), mime))
        .mount(server)
        .await;
}

#[tokio::test]
#[ignore = "requires a Chromium binary"]
async fn test_mirror_site_with_chromium() {
    let server = MockServer::start().await;

    mount(
        &server,
        "/",
        "text/html",
        r#"<html><head><link rel="stylesheet" href="/style.css"></head>
           <body><a href="/about">About</a><a href="https://example.org/">out</a>
           <script src="/app.js"></script></body></html>"#,
    )
    .await;
    mount(
        &server,
        "/about",
        "text/html",
        r#"<html><body><a href="/">Home</a></body></html>"#,
    )
    .await;
    mount(&server, "/style.css", "text/css", "body { margin: 0 }").await;
    // Adds a link at runtime; only visible to a rendered-DOM query
    mount(
        &server,
        "/app.js",
        "application/javascript",
        concat!(
            "const a = document.createElement('a');",
            " a.href = '/dynamic';",
            " document.body.appendChild(a);",
        ),
    )
    .await;
    mount(&server, "/dynamic", "text/html", "<p>dynamic</p>").await;

    let dir = tempfile::tempdir().unwrap();
    let browser = ChromiumBrowser::launch(&BrowserSettings::default()).await.unwrap();
    let page = browser.new_page().await.unwrap();

    let mut options = CrawlOptions::new(dir.path());
    options.navigation_timeout = Some(Duration::from_secs(20));
    let report = run_crawl(&page, &format!("{}/", server.uri()), options)
        .await
        .unwrap();
    browser.close().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed, "{:?}", report.failures);
    assert!(dir.path().join("index.html").is_file());
    assert!(dir.path().join("about/index.html").is_file());
    assert!(dir.path().join("dynamic/index.html").is_file());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("style.css")).unwrap(),
        "body { margin: 0 }"
    );
    assert!(report.skipped_cross_origin.contains("https://example.org/"));
}
