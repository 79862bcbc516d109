//! Integration tests for complete tracker runs.
//!
//! These tests drive `Tracker::run` against an in-memory CDN and a temporary
//! feed directory, covering:
//! - empty windows leaving every file untouched
//! - discovery, asset fallback, and numeric ordering
//! - idempotent reruns, deduplication, and cursor monotonicity
//! - the append policy
//!
//! Run with: `cargo test --test tracker_integration`

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use plist::{Dictionary, Value};
use tempfile::TempDir;

use mihome_tracker::config::TrackerConfig;
use mihome_tracker::fetch::{FetchError, HttpClient, HttpResponse, Method, RetryPolicy};
use mihome_tracker::manifest::SOFTWARE_PACKAGE_KIND;
use mihome_tracker::scan::NoopObserver;
use mihome_tracker::store::{MergePolicy, StorePaths};
use mihome_tracker::tracker::{RunSummary, Tracker};

// ============================================================================
// Helpers
// ============================================================================

const BUNDLE: &str = "com.xiaomi.mihome.dailybuild";
const TEMPLATE: &str = "https://cdn.test/MiHome-ios-Feature-build{build_number}.plist";

fn manifest_url(build: u64) -> String {
    TEMPLATE.replace("{build_number}", &build.to_string())
}

fn ipa_url(name: &str) -> String {
    format!("https://cdn.test/{}.ipa", name)
}

fn dict(entries: Vec<(&str, Value)>) -> Value {
    let mut dict = Dictionary::new();
    for (key, value) in entries {
        dict.insert(key.to_string(), value);
    }
    Value::Dictionary(dict)
}

/// A manifest item with one software-package asset.
fn package_item(bundle_identifier: &str, bundle_version: &str, url: &str) -> Value {
    let asset = dict(vec![
        ("kind", Value::from(SOFTWARE_PACKAGE_KIND)),
        ("url", Value::from(url)),
    ]);
    let metadata = dict(vec![
        ("bundle-identifier", Value::from(bundle_identifier)),
        ("bundle-version", Value::from(bundle_version)),
    ]);
    dict(vec![
        ("assets", Value::Array(vec![asset])),
        ("metadata", metadata),
    ])
}

/// In-memory CDN shared by every worker. Unknown URLs answer 404.
#[derive(Clone, Default)]
struct FakeCdn {
    routes: Arc<Mutex<HashMap<(Method, String), HttpResponse>>>,
}

impl FakeCdn {
    fn set(&self, method: Method, url: &str, status: u16, body: Vec<u8>) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, url.to_string()), HttpResponse::new(status, body));
    }

    /// Publish a build whose manifest lists `items`.
    fn publish(&self, build: u64, items: Vec<Value>) {
        let mut body = Vec::new();
        dict(vec![("items", Value::Array(items))])
            .to_writer_xml(&mut body)
            .unwrap();
        self.set(Method::Get, &manifest_url(build), 200, body);
    }

    /// Publish a build with one reachable package.
    fn publish_simple(&self, build: u64, version: &str, package: &str) {
        let url = ipa_url(package);
        self.publish(build, vec![package_item(BUNDLE, version, &url)]);
        self.set_package(&url, 200);
    }

    fn set_package(&self, url: &str, status: u16) {
        self.set(Method::Head, url, status, Vec::new());
    }
}

impl HttpClient for FakeCdn {
    fn request(&self, method: Method, url: &str, _: Duration) -> Result<HttpResponse, FetchError> {
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, Vec::new())))
    }
}

struct Feed {
    dir: TempDir,
}

impl Feed {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn paths(&self) -> StorePaths {
        StorePaths::in_dir(self.dir.path())
    }

    fn all(&self) -> Option<String> {
        read(&self.paths().all)
    }

    fn cursor(&self) -> Option<String> {
        read(&self.paths().cursor)
    }

    fn latest(&self) -> Option<String> {
        read(&self.paths().latest)
    }

    fn seed(&self, all: &str, cursor: u64, latest: Option<&str>) {
        let paths = self.paths();
        fs::write(&paths.all, all).unwrap();
        fs::write(&paths.cursor, cursor.to_string()).unwrap();
        if let Some(latest) = latest {
            fs::write(&paths.latest, latest).unwrap();
        }
    }
}

fn read(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

fn config(feed: &Feed, window: u64) -> TrackerConfig {
    TrackerConfig::default()
        .with_url_template(TEMPLATE)
        .with_bundle_identifier(BUNDLE)
        .with_window_size(window)
        .with_concurrency(8)
        .with_retry(RetryPolicy::new(1, Duration::ZERO))
        .with_store(feed.paths())
}

fn run(cdn: &FakeCdn, config: TrackerConfig, start: Option<u64>) -> RunSummary {
    let cdn = cdn.clone();
    let factory = move || Ok::<_, FetchError>(cdn.clone());
    Tracker::with_factory(config, factory)
        .unwrap()
        .with_start(start)
        .run(&NoopObserver)
        .unwrap()
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_empty_window_touches_nothing() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    fs::write(feed.paths().cursor, "999").unwrap();

    let summary = run(&cdn, config(&feed, 5), None);

    assert_eq!(summary.window.start, 1000);
    assert_eq!(summary.probed, 5);
    assert_eq!(summary.found, 0);
    assert_eq!(summary.files_written, 0);
    assert!(!summary.latest_changed);
    assert_eq!(feed.cursor().as_deref(), Some("999"));
    assert_eq!(feed.all(), None);
    assert_eq!(feed.latest(), None);
}

#[test]
fn test_single_build_in_first_window() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    cdn.publish_simple(500, "5.1.0", "mihome-500");

    let summary = run(&cdn, config(&feed, 1000), None);

    assert_eq!(summary.window.start, 1);
    assert_eq!(summary.probed, 1000);
    assert_eq!(summary.found, 1);
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.files_written, 3);
    assert_eq!(summary.cursor_after, 500);
    assert!(summary.latest_changed);

    let url = ipa_url("mihome-500");
    assert_eq!(feed.all(), Some(format!("5.1.0 {}\n", url)));
    assert_eq!(feed.cursor().as_deref(), Some("500"));
    assert_eq!(feed.latest(), Some(url));
}

#[test]
fn test_next_run_starts_after_cursor() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    cdn.publish_simple(3, "1.0.3", "b3");
    run(&cdn, config(&feed, 10), None);

    cdn.publish_simple(12, "1.0.12", "b12");
    let summary = run(&cdn, config(&feed, 10), None);

    assert_eq!(summary.window.start, 4);
    assert_eq!(summary.cursor_after, 12);
    assert_eq!(
        feed.all(),
        Some(format!("1.0.12 {}\n1.0.3 {}\n", ipa_url("b12"), ipa_url("b3")))
    );
    assert_eq!(feed.latest(), Some(ipa_url("b12")));
}

#[test]
fn test_unreachable_package_falls_back_to_next_item() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    let stale = ipa_url("stale");
    let fresh = ipa_url("fresh");
    cdn.publish(
        7,
        vec![
            package_item(BUNDLE, "2.0.0", &stale),
            package_item(BUNDLE, "1.9.0", &fresh),
        ],
    );
    cdn.set_package(&stale, 403);
    cdn.set_package(&fresh, 200);

    run(&cdn, config(&feed, 10), None);

    assert_eq!(feed.all(), Some(format!("1.9.0 {}\n", fresh)));
    assert_eq!(feed.latest(), Some(fresh));
}

#[test]
fn test_other_bundles_are_ignored() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    let url = ipa_url("store-build");
    cdn.publish(4, vec![package_item("com.xiaomi.mihome", "9.9.9", &url)]);
    cdn.set_package(&url, 200);

    let summary = run(&cdn, config(&feed, 10), None);

    assert_eq!(summary.found, 0);
    assert_eq!(summary.files_written, 0);
}

#[test]
fn test_versions_sort_numerically() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    cdn.publish_simple(1, "9.0.0", "nine");
    cdn.publish_simple(2, "10.0.0", "ten");
    cdn.publish_simple(3, "9.10.0", "nine-ten");

    run(&cdn, config(&feed, 5), None);

    assert_eq!(
        feed.all(),
        Some(format!(
            "10.0.0 {}\n9.10.0 {}\n9.0.0 {}\n",
            ipa_url("ten"),
            ipa_url("nine-ten"),
            ipa_url("nine")
        ))
    );
    assert_eq!(feed.latest(), Some(ipa_url("ten")));
}

#[test]
fn test_malformed_manifest_is_degraded() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    cdn.set(Method::Get, &manifest_url(2), 200, b"<html>not a plist".to_vec());
    cdn.publish_simple(3, "1.0.0", "ok");

    let summary = run(&cdn, config(&feed, 5), None);

    assert_eq!(summary.found, 1);
    assert_eq!(summary.degraded, 1);
    assert_eq!(feed.cursor().as_deref(), Some("3"));
}

// ============================================================================
// Merge semantics
// ============================================================================

#[test]
fn test_rerun_over_same_window_is_idempotent() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    cdn.publish_simple(2, "1.0.2", "b2");
    cdn.publish_simple(5, "1.0.5", "b5");
    fs::write(feed.paths().cursor, "0").unwrap();
    run(&cdn, config(&feed, 10), None);

    // Same cursor, same remote: the second run must see the same window.
    fs::write(feed.paths().cursor, "0").unwrap();
    let before = (feed.all(), feed.cursor(), feed.latest());
    let summary = run(&cdn, config(&feed, 10), None);

    assert_eq!(summary.window.start, 1);
    assert_eq!(summary.found, 2);
    assert_eq!(summary.new_records, 0);
    assert_eq!(summary.files_written, 0);
    assert_eq!(summary.cursor_after, 0);
    assert!(!summary.latest_changed);
    assert_eq!((feed.all(), feed.cursor(), feed.latest()), before);
}

#[test]
fn test_backfill_over_known_builds_writes_nothing() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    cdn.publish_simple(2, "1.0.2", "b2");
    cdn.publish_simple(5, "1.0.5", "b5");
    run(&cdn, config(&feed, 10), None);

    let before = (feed.all(), feed.cursor(), feed.latest());
    let summary = run(&cdn, config(&feed, 10), Some(1));

    assert_eq!(summary.new_records, 0);
    assert_eq!(summary.files_written, 0);
    assert_eq!((feed.all(), feed.cursor(), feed.latest()), before);
}

#[test]
fn test_rediscovered_url_is_not_duplicated() {
    let feed = Feed::new();
    let url = ipa_url("known");
    feed.seed(&format!("3.0.0 {}\n", url), 0, Some(&url));

    let cdn = FakeCdn::default();
    cdn.publish_simple(8, "3.0.0", "known");

    let summary = run(&cdn, config(&feed, 10), None);

    assert_eq!(summary.new_records, 0);
    assert_eq!(summary.files_written, 0);
    assert_eq!(feed.all(), Some(format!("3.0.0 {}\n", url)));
    assert_eq!(feed.cursor().as_deref(), Some("0"));
    assert!(!summary.latest_changed);
}

#[test]
fn test_cursor_never_moves_backwards() {
    let feed = Feed::new();
    let top = ipa_url("top");
    feed.seed(&format!("4.0.0 {}\n", top), 900, Some(&top));

    let cdn = FakeCdn::default();
    cdn.publish_simple(5, "3.5.0", "backfill");

    let summary = run(&cdn, config(&feed, 10), Some(1));

    assert_eq!(summary.cursor_before, 900);
    assert_eq!(summary.cursor_after, 900);
    assert_eq!(feed.cursor().as_deref(), Some("900"));
    assert_eq!(
        feed.all(),
        Some(format!("4.0.0 {}\n3.5.0 {}\n", top, ipa_url("backfill")))
    );
}

#[test]
fn test_pointer_kept_when_top_unchanged() {
    let feed = Feed::new();
    let top = ipa_url("top");
    feed.seed(&format!("4.0.0 {}\n", top), 10, Some(&top));

    let cdn = FakeCdn::default();
    cdn.publish_simple(11, "3.9.0", "older");

    let summary = run(&cdn, config(&feed, 5), None);

    assert!(!summary.latest_changed);
    assert_eq!(summary.latest.as_deref(), Some(top.as_str()));
    assert_eq!(summary.files_written, 2);
    assert_eq!(feed.latest(), Some(top));
}

#[test]
fn test_append_policy_prepends_verbatim() {
    let feed = Feed::new();
    let prior = format!("1.0.0 {}\n", ipa_url("first"));
    feed.seed(&prior, 10, Some(&ipa_url("first")));

    let cdn = FakeCdn::default();
    cdn.publish_simple(11, "1.1.0", "second");
    cdn.publish_simple(12, "1.2.0", "third");

    let config = config(&feed, 5).with_merge_policy(MergePolicy::Append);
    let summary = run(&cdn, config, None);

    assert_eq!(summary.policy, MergePolicy::Append);
    assert_eq!(summary.new_records, 2);
    assert_eq!(
        feed.all(),
        Some(format!(
            "1.2.0 {}\n1.1.0 {}\n{}",
            ipa_url("third"),
            ipa_url("second"),
            prior
        ))
    );
    assert_eq!(feed.cursor().as_deref(), Some("12"));
    assert_eq!(feed.latest(), Some(ipa_url("third")));
}

#[test]
fn test_status_reflects_feed() {
    let feed = Feed::new();
    let cdn = FakeCdn::default();
    cdn.publish_simple(6, "2.0.0", "six");
    run(&cdn, config(&feed, 10), None);

    let factory = || Ok::<_, FetchError>(FakeCdn::default());
    let status = Tracker::with_factory(config(&feed, 10), factory)
        .unwrap()
        .status()
        .unwrap();

    assert_eq!(status.cursor, 6);
    assert_eq!(status.records, 1);
    assert_eq!(status.top_version.as_deref(), Some("2.0.0"));
    assert_eq!(status.latest, Some(ipa_url("six")));
    assert_eq!(status.next_window_start, 7);
    assert_eq!(status.next_window_end, 16);
}
