//! End-to-end harvest sessions
//!
//! Detail pages are served by wiremock; the listing and the review pages come from the
//! scripted browser in `support`.

use crate::support::{
    audience_page, critic_page, detail_page, test_config, MemoryStore, ScriptedBrowser,
};
use reel_harvest::crawler::{build_http_client, CrawlSession, SessionReport};
use reel_harvest::extract::TomatoLayout;
use reel_harvest::records::DatasetKind;
use reel_harvest::sink::{IncrementalSink, RetryPolicy, SheetsStore, SnapshotWriter, TabularStore};
use reel_harvest::storage::{open_journal, RunStatus};
use reel_harvest::{Config, HarvestError};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves three detail pages: two harvestable films and one missing page
async fn mount_detail_pages(server: &MockServer) {
    let pages = [
        (
            "/m/film_0",
            detail_page(
                "Film Zero",
                Some("/m/film_0/reviews"),
                Some("/m/film_0/reviews?type=user"),
                &["Ada Lane", "Bo Reyes"],
            ),
        ),
        (
            "/m/film_1",
            detail_page("Film One", Some("/m/film_1/reviews"), None, &["Cy Moss"]),
        ),
    ];
    for (route, body) in pages {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/m/film_2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn scripted_site() -> ScriptedBrowser {
    ScriptedBrowser::new()
        .with_tiles(&["/m/film_0", "/m/film_1"])
        .with_round(&["/m/film_2"])
        .with_reviews(
            "/m/film_0/reviews",
            vec![
                critic_page("zero p1", 2, Some("next")),
                critic_page("zero p2", 1, Some("next hide")),
            ],
        )
        .with_reviews(
            "/m/film_0/reviews?type=user",
            vec![audience_page("zero", 2)],
        )
        .with_reviews("/m/film_1/reviews", vec![critic_page("one", 1, None)])
}

fn memory_sink(
    store: MemoryStore,
    config: &Config,
    journal: Option<&Path>,
) -> IncrementalSink<MemoryStore> {
    let snapshots = SnapshotWriter::new(&config.output.snapshot_dir).unwrap();
    let journal = open_journal(journal).unwrap();
    IncrementalSink::with_journal(store, snapshots, RetryPolicy::none(), journal).unwrap()
}

async fn run_session<S: TabularStore>(
    browser: &ScriptedBrowser,
    config: &Config,
    sink: IncrementalSink<S>,
) -> (reel_harvest::Result<SessionReport>, IncrementalSink<S>) {
    let client = build_http_client(&config.crawler).unwrap();
    let layout = TomatoLayout::new();
    let mut session = CrawlSession::new(browser, &layout, config, client, sink);
    let outcome = session.run().await;
    (outcome, session.into_sink())
}

fn delivered(report: &SessionReport, kind: DatasetKind) -> usize {
    report
        .delivered
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, n)| *n)
        .unwrap()
}

#[tokio::test]
async fn test_full_harvest_to_remote_sheet() {
    let server = MockServer::start().await;
    mount_detail_pages(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex("^/v4/spreadsheets/sheet-1/values/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "updatedRows": 1
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path().to_str().unwrap(), None);
    let store = SheetsStore::new(&config.remote, "test-token".to_string()).unwrap();
    let snapshots = SnapshotWriter::new(dir.path()).unwrap();
    let sink = IncrementalSink::with_journal(
        store,
        snapshots,
        RetryPolicy::none(),
        open_journal(None).unwrap(),
    )
    .unwrap();

    let browser = scripted_site();
    let (outcome, sink) = run_session(&browser, &config, sink).await;
    let report = outcome.unwrap();

    assert_eq!(report.discovered, 3);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.flush_failures, 0);
    assert!(!report.cancelled);
    assert_eq!(delivered(&report, DatasetKind::Cast), 3);
    assert_eq!(delivered(&report, DatasetKind::Movies), 2);
    assert_eq!(delivered(&report, DatasetKind::Reviews), 6);

    let titles: Vec<_> = sink.movies().records().iter().map(|m| &m.title).collect();
    assert_eq!(titles, ["Film Zero", "Film One"]);
    assert_eq!(sink.movies().records()[0].genre, ["Drama", "Comedy"]);
    assert!(sink
        .reviews()
        .records()
        .iter()
        .take(5)
        .all(|r| r.movie_title == "Film Zero"));

    let ranges: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|req| req.url.path().starts_with("/v4/"))
        .map(|req| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            body["range"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        ranges,
        [
            "Cast!A1:D3",
            "Movies!A1:R2",
            "Reviews!A1:E6",
            "Cast!A4:D4",
            "Movies!A3:R3",
            "Reviews!A7:E7",
        ]
    );

    // One primary context plus one per review category actually walked
    assert_eq!(browser.opened_total(), 4);
    assert_eq!(browser.max_open(), 2);
    assert_eq!(browser.open_now(), 0);

    let movies_csv = std::fs::read_to_string(dir.path().join("movies.csv")).unwrap();
    assert_eq!(movies_csv.lines().count(), 3);
    let reviews_csv = std::fs::read_to_string(dir.path().join("reviews.csv")).unwrap();
    assert!(reviews_csv.contains("zero p2 critic 0"));
    assert!(reviews_csv.contains("zero fan 1"));
}

#[tokio::test]
async fn test_remote_outage_is_resumed_without_duplicates() {
    let server = MockServer::start().await;
    mount_detail_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path().to_str().unwrap(), None);
    // The cast and movie writes of the first film are rejected
    let store = MemoryStore::failing(2);
    let sink = memory_sink(store.clone(), &config, None);

    let browser = scripted_site();
    let (outcome, _sink) = run_session(&browser, &config, sink).await;
    let report = outcome.unwrap();

    assert_eq!(report.flush_failures, 2);
    assert!(report.pending.iter().all(|(_, n)| *n == 0));
    assert_eq!(store.ranges("Cast"), ["Cast!A1:D4"]);
    assert_eq!(store.ranges("Movies"), ["Movies!A1:R3"]);
    assert_eq!(store.ranges("Reviews"), ["Reviews!A1:E6", "Reviews!A7:E7"]);

    let movie_rows: Vec<_> = store
        .writes()
        .into_iter()
        .filter(|(range, _)| range.starts_with("Movies!"))
        .flat_map(|(_, rows)| rows)
        .collect();
    assert_eq!(movie_rows.len(), 3);
    assert_eq!(movie_rows[0][0], "title");
    assert_eq!(movie_rows[1][0], "Film Zero");
    assert_eq!(movie_rows[2][0], "Film One");
}

#[tokio::test]
async fn test_journal_resumes_where_the_last_run_stopped() {
    let server = MockServer::start().await;
    mount_detail_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let journal_path = dir.path().join("journal.db");
    let mut config = test_config(
        &server.uri(),
        dir.path().to_str().unwrap(),
        Some(journal_path.to_string_lossy().into_owned()),
    );
    config.crawler.max_detail_pages = Some(1);

    let first_store = MemoryStore::default();
    let sink = memory_sink(first_store.clone(), &config, Some(&journal_path));
    let (outcome, _sink) = run_session(&scripted_site(), &config, sink).await;
    let first = outcome.unwrap();
    // the identifier the cap stopped in front of is not counted
    assert_eq!(first.discovered, 1);
    assert_eq!(first.processed, 1);
    assert_eq!(first_store.ranges("Movies"), ["Movies!A1:R2"]);

    config.crawler.max_detail_pages = None;
    let second_store = MemoryStore::default();
    let sink = memory_sink(second_store.clone(), &config, Some(&journal_path));
    let (outcome, sink) = run_session(&scripted_site(), &config, sink).await;
    let second = outcome.unwrap();

    assert_eq!(second.skipped, 1);
    assert_eq!(second.processed, 1);
    assert_eq!(second.failed, 1);
    // Nothing delivered by the first run is sent again, and no header either
    assert_eq!(second_store.ranges("Cast"), ["Cast!A4:D4"]);
    assert_eq!(second_store.ranges("Movies"), ["Movies!A3:R3"]);
    assert_eq!(second_store.ranges("Reviews"), ["Reviews!A7:E7"]);
    assert_eq!(sink.movies().len(), 2);

    let journal = open_journal(Some(&journal_path)).unwrap();
    assert_eq!(journal.load_cursor(DatasetKind::Movies).unwrap(), 2);
    assert_eq!(journal.count_processed().unwrap(), 2);
    let run = journal.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_cancellation_stops_before_the_next_identifier() {
    let server = MockServer::start().await;
    mount_detail_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let journal_path = dir.path().join("journal.db");
    let config = test_config(
        &server.uri(),
        dir.path().to_str().unwrap(),
        Some(journal_path.to_string_lossy().into_owned()),
    );

    let store = MemoryStore::default();
    let sink = memory_sink(store.clone(), &config, Some(&journal_path));
    let browser = scripted_site();
    let client = build_http_client(&config.crawler).unwrap();
    let layout = TomatoLayout::new();
    let mut session = CrawlSession::new(&browser, &layout, &config, client, sink)
        .with_cancellation(Arc::new(AtomicBool::new(true)));

    let report = session.run().await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.discovered, 0);
    assert_eq!(report.processed, 0);
    assert!(store.writes().is_empty());
    assert_eq!(browser.open_now(), 0);

    let journal = open_journal(Some(&journal_path)).unwrap();
    let run = journal.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_unreachable_entry_page_is_fatal() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path().to_str().unwrap(), None);
    let store = MemoryStore::default();
    let sink = memory_sink(store.clone(), &config, None);
    let browser = scripted_site().failing_entry();

    let (outcome, _sink) = run_session(&browser, &config, sink).await;

    assert!(matches!(
        outcome,
        Err(HarvestError::EntryUnavailable { .. })
    ));
    assert_eq!(browser.open_now(), 0);
    assert!(store.writes().is_empty());
}
