//! Integration tests for the crawler
//!
//! These tests drive the coordinator through a scripted in-process page
//! serving a synthetic site, and inspect the mirror it writes.

use crate::support::{read_tree, FakePage, FakeSite, ORIGIN};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sumi_mirror::config::FailurePolicy;
use sumi_mirror::browser::BrowserError;
use sumi_mirror::crawler::{run_crawl, Coordinator, CrawlOptions, CrawlOutcome, FailureKind};
use sumi_mirror::MirrorError;
use tokio_util::sync::CancellationToken;

fn entry() -> String {
    format!("{}/", ORIGIN)
}

fn options(root: &Path) -> CrawlOptions {
    CrawlOptions::new(root)
}

fn relative(root: &Path, written: &[PathBuf]) -> Vec<String> {
    written
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_cycle_visits_each_page_once() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/b">b</a>"#)
        .page("/b", r#"<a href="/">home</a><a href="/b">self</a>"#);
    let page = FakePage::new(site);

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(page.navigated_paths(), vec!["/", "/b"]);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(
        relative(dir.path(), &report.written),
        vec!["index.html", "b/index.html"]
    );
}

#[tokio::test]
async fn test_depth_first_order_and_visited_set() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/a">a</a><a href="/b">b</a>"#)
        .page("/a", r#"<a href="/">home</a><a href="/c">c</a>"#)
        .page("/b", "<p>b</p>")
        .page("/c", "<p>c</p>");
    let page = FakePage::new(site);

    let entrypoint = url::Url::parse(&entry()).unwrap();
    let mut coordinator = Coordinator::new(&page, options(dir.path()));
    let report = coordinator.run(&entrypoint).await.unwrap();

    assert_eq!(page.navigated_paths(), vec!["/", "/a", "/c", "/b"]);

    let visited = coordinator.visited();
    assert_eq!(visited.len(), 4);
    for path in ["index.html", "a/index.html", "b/index.html", "c/index.html"] {
        assert!(visited.contains(&dir.path().join(path)), "{path} not claimed");
    }
    assert_eq!(report.failure_count(), 0);
}

#[tokio::test]
async fn test_cross_origin_never_followed_or_written() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page_with_assets(
            "/",
            r#"<a href="https://other.test/page">elsewhere</a><a href="/local">local</a>"#,
            &["https://cdn.test/lib.js", "/app.js"],
        )
        .page("/local", "<p>local</p>")
        .page("https://other.test/page", "<p>other</p>")
        .asset("https://cdn.test/lib.js", "application/javascript", "lib()")
        .asset("/app.js", "application/javascript", "app()");
    let page = FakePage::new(site);

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert!(page.navigations().iter().all(|u| u.starts_with(ORIGIN)));
    assert!(report
        .skipped_cross_origin
        .contains("https://other.test/page"));

    let tree = read_tree(dir.path());
    let files: Vec<&PathBuf> = tree.keys().collect();
    assert_eq!(
        files,
        vec![
            &PathBuf::from("app.js"),
            &PathBuf::from("index.html"),
            &PathBuf::from("local/index.html"),
        ]
    );
    assert_eq!(tree[Path::new("app.js")], b"app()");
}

#[tokio::test]
async fn test_stylesheet_link_written_once_not_navigated() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page_with_assets(
            "/",
            r#"<link rel="stylesheet" href="/style.css"><a href="/about">about</a>"#,
            &["/style.css"],
        )
        .page_with_assets(
            "/about",
            r#"<link rel="stylesheet" href="/style.css">"#,
            &["/style.css"],
        )
        .asset("/style.css", "text/css", "body { margin: 0 }");
    let page = FakePage::new(site);

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert_eq!(page.navigated_paths(), vec!["/", "/about"]);
    let written = relative(dir.path(), &report.written);
    assert_eq!(written.iter().filter(|p| *p == "style.css").count(), 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("style.css")).unwrap(),
        "body { margin: 0 }"
    );
    assert!(dir.path().join("about/index.html").is_file());
}

#[tokio::test]
async fn test_binary_asset_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];
    let site = FakeSite::new()
        .page_with_assets("/", r#"<img src="/img/logo.png">"#, &["/img/logo.png"])
        .binary_asset("/img/logo.png", "image/png", &png);
    let page = FakePage::new(site);

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert_eq!(std::fs::read(dir.path().join("img/logo.png")).unwrap(), png);
    assert_eq!(report.assets_written, 2);
}

#[tokio::test]
async fn test_navigation_error_does_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/broken">x</a><a href="/fine">y</a>"#)
        .page("/broken", "<p>never</p>")
        .page("/fine", "<p>fine</p>");
    let page = FakePage::new(site).fail_navigation("/broken");

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(page.navigated_paths(), vec!["/", "/broken", "/fine"]);

    let failures: Vec<_> = report.failures_of(FailureKind::NavigationError).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, format!("{}/broken", ORIGIN));
    assert!(!dir.path().join("broken").exists());
    assert!(dir.path().join("fine/index.html").is_file());
}

#[tokio::test]
async fn test_abort_policy_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/broken">x</a><a href="/fine">y</a>"#)
        .page("/broken", "<p>never</p>")
        .page("/fine", "<p>fine</p>");
    let page = FakePage::new(site).fail_navigation("/broken");

    let mut opts = options(dir.path());
    opts.on_failure = FailurePolicy::Abort;
    let report = run_crawl(&page, &entry(), opts).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Aborted);
    assert_eq!(page.navigated_paths(), vec!["/", "/broken"]);

    let cause = report.abort_cause().unwrap();
    assert_eq!(cause.kind, FailureKind::NavigationError);
    assert!(dir.path().join("index.html").is_file());
    assert!(!dir.path().join("fine").exists());
}

#[tokio::test]
async fn test_navigation_timeout_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/slow">slow</a><a href="/next">next</a>"#)
        .page("/slow", r#"<a href="/hidden">hidden</a>"#)
        .page("/next", "<p>next</p>")
        .page("/hidden", "<p>hidden</p>");
    let page = FakePage::new(site).hang_navigation("/slow");

    let mut opts = options(dir.path());
    opts.navigation_timeout = Some(Duration::from_millis(100));
    let report = run_crawl(&page, &entry(), opts).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.failures_of(FailureKind::NavigationTimeout).count(), 1);
    // Links of a timed-out page are not followed
    assert_eq!(page.navigated_paths(), vec!["/", "/slow", "/next"]);
    assert_eq!(report.pages_visited, 2);
}

#[tokio::test]
async fn test_cancellation_between_targets() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/a">a</a><a href="/b">b</a>"#)
        .page("/a", "<p>a</p>")
        .page("/b", "<p>b</p>");
    let page = FakePage::new(site);

    let token = CancellationToken::new();
    page.cancel_after(1, token.clone());

    let entrypoint = url::Url::parse(&entry()).unwrap();
    let mut coordinator = Coordinator::new(&page, options(dir.path())).with_cancellation(token);
    let report = coordinator.run(&entrypoint).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Cancelled);
    assert_eq!(page.navigated_paths(), vec!["/"]);
    // The in-flight page is still written
    assert!(dir.path().join("index.html").is_file());
    assert!(!dir.path().join("a").exists());
}

#[tokio::test]
async fn test_write_failure_recorded_and_crawl_continues() {
    let dir = tempfile::tempdir().unwrap();
    // A file where the document's directory must go
    std::fs::write(dir.path().join("about"), b"in the way").unwrap();

    let site = FakeSite::new()
        .page("/", r#"<a href="/about">about</a><a href="/contact">contact</a>"#)
        .page("/about", "<p>about</p>")
        .page("/contact", "<p>contact</p>");
    let page = FakePage::new(site);

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    let failures: Vec<_> = report.failures_of(FailureKind::WriteFailed).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].path.as_deref(),
        Some(dir.path().join("about/index.html").as_path())
    );
    assert!(dir.path().join("contact/index.html").is_file());
}

#[tokio::test]
async fn test_mirror_is_idempotent() {
    let site = FakeSite::new()
        .page_with_assets(
            "/",
            r#"<a href="/docs/">docs</a><a href="/docs/intro.html">intro</a>"#,
            &["/static/site.css", "/static/app.js"],
        )
        .page("/docs/", r#"<a href="intro.html">intro</a>"#)
        .page("/docs/intro.html", r#"<a href="../">up</a>"#)
        .asset("/static/site.css", "text/css", "h1 { color: teal }")
        .asset("/static/app.js", "application/javascript", "console.log(1)");

    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();

    let first = FakePage::new(site.clone());
    run_crawl(&first, &entry(), options(first_dir.path())).await.unwrap();
    let second = FakePage::new(site.clone());
    run_crawl(&second, &entry(), options(second_dir.path())).await.unwrap();

    let before = read_tree(first_dir.path());
    assert_eq!(before, read_tree(second_dir.path()));

    // Re-running over an existing mirror replaces files in place
    let third = FakePage::new(site);
    run_crawl(&third, &entry(), options(first_dir.path())).await.unwrap();
    assert_eq!(before, read_tree(first_dir.path()));

    assert!(before.contains_key(Path::new("docs/index.html")));
    assert!(before.contains_key(Path::new("docs/intro.html")));
    assert!(before.contains_key(Path::new("static/site.css")));
}

#[tokio::test]
async fn test_base_href_and_ignored_links() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page(
            "/",
            r#"<base href="/guide/">
                <a href="start">start</a>
                <a href="mailto:team@site.test">mail</a>
                <a href="javascript:void(0)">js</a>"#,
        )
        .page("/guide/start", "<p>start</p>");
    let page = FakePage::new(site);

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert_eq!(page.navigated_paths(), vec!["/", "/guide/start"]);
    assert_eq!(report.failure_count(), 0);
    assert!(dir.path().join("guide/start/index.html").is_file());
}

#[tokio::test]
async fn test_abort_still_writes_responses_of_failed_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/slow">slow</a><a href="/next">next</a>"#)
        .page_with_assets("/slow", "<p>slow</p>", &["/slow.css"])
        .page("/next", "<p>next</p>")
        .asset("/slow.css", "text/css", "p { color: gray }");
    let page = FakePage::new(site).hang_navigation("/slow");

    let mut opts = options(dir.path());
    opts.navigation_timeout = Some(Duration::from_millis(100));
    opts.on_failure = FailurePolicy::Abort;
    let report = run_crawl(&page, &entry(), opts).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Aborted);
    assert_eq!(page.navigated_paths(), vec!["/", "/slow"]);
    assert_eq!(
        report.abort_cause().unwrap().kind,
        FailureKind::NavigationTimeout
    );
    assert_eq!(
        relative(dir.path(), &report.written),
        vec!["index.html", "slow/index.html", "slow.css"]
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("slow.css")).unwrap(),
        "p { color: gray }"
    );
}

#[tokio::test]
async fn test_lost_body_recorded_and_crawl_continues() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page_with_assets("/", r#"<a href="/next">next</a>"#, &["/gone.js", "/kept.js"])
        .page("/next", "<p>next</p>")
        .asset("/gone.js", "application/javascript", "gone()")
        .asset("/kept.js", "application/javascript", "kept()");
    let page = FakePage::new(site).lose_body("/gone.js");

    let report = run_crawl(&page, &entry(), options(dir.path())).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    let failures: Vec<_> = report.failures_of(FailureKind::FetchFailed).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, format!("{}/gone.js", ORIGIN));
    assert_eq!(
        failures[0].path.as_deref(),
        Some(dir.path().join("gone.js").as_path())
    );
    assert!(!dir.path().join("gone.js").exists());
    assert!(dir.path().join("kept.js").is_file());
    assert!(dir.path().join("next/index.html").is_file());
}

#[tokio::test]
async fn test_malformed_link_reported_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="http://[::1">broken</a><a href="/next">next</a>"#)
        .page("/next", "<p>next</p>");
    let page = FakePage::new(site);

    let mut opts = options(dir.path());
    opts.on_failure = FailurePolicy::Abort;
    let report = run_crawl(&page, &entry(), opts).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    let invalid: Vec<_> = report.failures_of(FailureKind::InvalidUrl).collect();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].url, "http://[::1");
    assert_eq!(page.navigated_paths(), vec!["/", "/next"]);
}

#[tokio::test]
async fn test_browser_crash_during_navigation_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page("/", r#"<a href="/crash">crash</a><a href="/next">next</a>"#)
        .page("/crash", "<p>crash</p>")
        .page("/next", "<p>next</p>");
    let page = FakePage::new(site).crash_on_navigation("/crash");

    let result = run_crawl(&page, &entry(), options(dir.path())).await;

    assert!(matches!(
        result,
        Err(MirrorError::Browser(BrowserError::Closed(_)))
    ));
    assert_eq!(page.navigated_paths(), vec!["/", "/crash"]);
}

#[tokio::test]
async fn test_browser_crash_during_body_fetch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new()
        .page_with_assets("/", r#"<a href="/next">next</a>"#, &["/app.js"])
        .page("/next", "<p>next</p>")
        .asset("/app.js", "application/javascript", "app()");
    let page = FakePage::new(site).crash_on_fetch("/app.js");

    let result = run_crawl(&page, &entry(), options(dir.path())).await;

    assert!(matches!(
        result,
        Err(MirrorError::Browser(BrowserError::Closed(_)))
    ));
    assert_eq!(page.navigated_paths(), vec!["/"]);
}
