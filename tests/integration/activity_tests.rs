//! Integration tests for login, the activity log scan and reconciliation
//!
//! These tests use wiremock to serve the forum and tempfile databases to
//! check what ends up in the store.

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{
    log_page, log_row, mount_header_api, mount_login, test_config, LOGGED_IN_PAGE, REJECTED_PAGE,
};
use forum_harvest::config::{EmptyLaterPage, MembershipConfig};
use forum_harvest::crawler::{run_activity_sync, ActivityCrawler, MembershipResolver, PageFetcher};
use forum_harvest::retry::RetryPolicy;
use forum_harvest::session::{build_http_client, ForumSession, HeaderPool, LoginError};
use forum_harvest::storage::{ActivityFilter, ActivityStore, SqliteStore};
use forum_harvest::{ActivityRecord, DateRange, HarvestError, ModScope};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn window(start: &str, end: &str) -> DateRange {
    DateRange::new(date(start), date(end)).unwrap()
}

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn anonymous_session(server: &MockServer) -> ForumSession {
    let base = url::Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = build_http_client(&Default::default()).unwrap();
    ForumSession::anonymous(client, HeaderPool::fallback(2), base)
}

async fn mount_log_page(server: &MockServer, start: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/mcp.php"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_roster_page(server: &MockServer, start: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/memberlist.php"))
        .and(query_param("g", "7"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

const ROSTER_ALICJA: &str = r#"<html><body>
    <div class="member-card">
        <a class="username" href="./memberlist.php?mode=viewprofile&amp;u=2">Alicja</a>
    </div>
</body></html>"#;

const ROSTER_CELINA: &str = r#"<html><body>
    <div class="member-card">
        <a class="username" href="./memberlist.php?mode=viewprofile&amp;u=9">Celina</a>
    </div>
</body></html>"#;

const EMPTY_PAGE: &str = "<html><body></body></html>";

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/ucp.php"))
        .and(query_param("mode", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::LOGIN_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    // Hidden fields are posted back along with the credentials
    Mock::given(method("POST"))
        .and(path("/ucp.php"))
        .and(header("origin", server.uri().as_str()))
        .and(body_string_contains("sid=abc123"))
        .and(body_string_contains("form_token=tok"))
        .and(body_string_contains("username=crawler"))
        .and(body_string_contains("password=secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGGED_IN_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let client = build_http_client(&config.network).unwrap();
    let session = ForumSession::login(client, HeaderPool::fallback(2), &config)
        .await
        .unwrap();

    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_login_rejected_is_retried_then_fatal() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/ucp.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::LOGIN_PAGE))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ucp.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REJECTED_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let client = build_http_client(&config.network).unwrap();
    let err = ForumSession::login(client, HeaderPool::fallback(2), &config)
        .await
        .unwrap_err();

    match err {
        LoginError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(last.to_string().contains("nieprawidłowe hasło"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_missing_login_form_is_not_retried() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/ucp.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let client = build_http_client(&config.network).unwrap();
    let err = ForumSession::login(client, HeaderPool::fallback(2), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, LoginError::FormNotFound(id) if id == "login"));
}

#[tokio::test]
async fn test_scan_stops_at_first_row_before_window() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    mount_log_page(
        &server,
        "0",
        log_page(&[
            log_row("Alicja", "Usunięto post", "w temacie A", "10 lis 2024, 12:00"),
            log_row("Alicja", "Usunięto post", "w temacie B", "8 lis 2024, 10:00"),
        ]),
    )
    .await;
    mount_log_page(
        &server,
        "15",
        log_page(&[
            log_row("Bartek", "Przeniesiono temat", "Ankieta", "5 lis 2024, 09:30"),
            log_row("Alicja", "Zablokowano użytkownika", "spamer", "4 lis 2024, 18:45"),
        ]),
    )
    .await;
    mount_log_page(
        &server,
        "30",
        log_page(&[
            log_row("Alicja", "Edytowano post", "w temacie C", "2 lis 2024, 08:00"),
            log_row("Bartek", "Usunięto post", "w temacie D", "31 paź 2024, 23:59"),
            log_row("Alicja", "Usunięto post", "w temacie E", "3 lis 2024, 11:00"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/mcp.php"))
        .and(query_param("start", "45"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let fetcher = PageFetcher::new(
        anonymous_session(&server),
        2,
        Vec::new(),
        RetryPolicy::fixed(1, Duration::ZERO),
    );
    let crawler = ActivityCrawler::new(fetcher, Arc::new(config.activity.clone())).unwrap();

    let records = crawler.scrape(&window("2024-11-01", "2024-11-08")).await;

    let timestamps: Vec<_> = records.iter().map(|r| r.timestamp).collect();
    assert_eq!(
        timestamps,
        vec![
            at("2024-11-08 10:00:00"),
            at("2024-11-05 09:30:00"),
            at("2024-11-04 18:45:00"),
            at("2024-11-02 08:00:00"),
        ]
    );
    assert_eq!(records[1].action, "Przeniesiono temat");
    assert_eq!(records[1].details, "Ankieta");
    assert_eq!(records[1].moderator, "Bartek");
}

#[tokio::test]
async fn test_scan_ends_on_empty_page() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    mount_log_page(
        &server,
        "0",
        log_page(&[log_row("Alicja", "Usunięto post", "x", "3 lis 2024, 14:05")]),
    )
    .await;
    mount_log_page(&server, "15", EMPTY_PAGE.to_string()).await;

    let config = test_config(&server, dir.path());
    let fetcher = PageFetcher::new(
        anonymous_session(&server),
        2,
        Vec::new(),
        RetryPolicy::fixed(1, Duration::ZERO),
    );
    let crawler = ActivityCrawler::new(fetcher, Arc::new(config.activity.clone())).unwrap();

    let records = crawler.scrape(&window("2024-11-01", "2024-11-08")).await;
    assert_eq!(records.len(), 1);
}

fn resolver(server: &MockServer, membership: MembershipConfig) -> MembershipResolver {
    MembershipResolver::new(
        anonymous_session(server),
        Arc::new(membership),
        RetryPolicy::fixed(2, Duration::ZERO),
    )
}

#[tokio::test]
async fn test_roster_reads_every_offset() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_roster_page(&server, "0", ROSTER_ALICJA).await;
    mount_roster_page(&server, "15", ROSTER_CELINA).await;

    let config = test_config(&server, dir.path());
    let members = resolver(&server, config.membership.clone())
        .get_members(7)
        .await
        .unwrap();

    let names: Vec<_> = members.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["Alicja", "Celina"]);
}

#[tokio::test]
async fn test_empty_later_page_is_retried_then_empty() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/memberlist.php"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ROSTER_ALICJA))
        .expect(2)
        .mount(&server)
        .await;
    mount_roster_page(&server, "15", EMPTY_PAGE).await;

    let config = test_config(&server, dir.path());
    assert_eq!(config.membership.empty_later_page, EmptyLaterPage::Fail);
    let members = resolver(&server, config.membership.clone())
        .get_members(7)
        .await
        .unwrap();

    assert!(members.is_empty());
}

#[tokio::test]
async fn test_empty_later_page_ends_roster_when_configured() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/memberlist.php"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ROSTER_ALICJA))
        .expect(1)
        .mount(&server)
        .await;
    mount_roster_page(&server, "15", EMPTY_PAGE).await;

    let mut config = test_config(&server, dir.path());
    config.membership.empty_later_page = EmptyLaterPage::End;
    let members = resolver(&server, config.membership.clone())
        .get_members(7)
        .await
        .unwrap();

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "Alicja");
}

#[tokio::test]
async fn test_empty_roster_is_retried_then_empty() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/memberlist.php"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let resolver = MembershipResolver::new(
        anonymous_session(&server),
        Arc::new(config.membership.clone()),
        RetryPolicy::fixed(2, Duration::ZERO),
    );

    let members = resolver.get_members(7).await.unwrap();
    assert!(members.is_empty());
}

#[tokio::test]
async fn test_unreachable_roster_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/memberlist.php"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let resolver = MembershipResolver::new(
        anonymous_session(&server),
        Arc::new(config.membership.clone()),
        RetryPolicy::fixed(2, Duration::ZERO),
    );

    let result = resolver.get_members(7).await;
    assert!(matches!(result, Err(HarvestError::RosterUnavailable(_))));
}

#[tokio::test]
async fn test_sync_crawls_only_missing_ranges() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_header_api(&server).await;
    mount_login(&server, LOGGED_IN_PAGE).await;
    mount_roster_page(&server, "0", ROSTER_ALICJA).await;
    mount_roster_page(&server, "15", ROSTER_CELINA).await;

    mount_log_page(
        &server,
        "0",
        log_page(&[
            log_row("Alicja", "Usunięto post „Spam”", "w temacie A", "7 lis 2024, 10:00"),
            log_row("Bartek", "Usunięto post", "w temacie B", "5 lis 2024, 11:00"),
            log_row("Alicja", "Usunięto post", "w temacie C", "4 lis 2024, 12:00"),
        ]),
    )
    .await;
    mount_log_page(
        &server,
        "15",
        log_page(&[
            log_row("Alicja", "Zablokowano użytkownika", "spamer", "2 lis 2024, 13:00"),
            log_row("ALICJA", "Edytowano post", "w temacie D", "1 lis 2024, 00:00"),
            log_row("Alicja", "Usunięto post", "w temacie E", "31 paź 2024, 15:00"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/mcp.php"))
        .and(query_param("start", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let mut store = SqliteStore::new(&dir.path().join("activity.db")).unwrap();

    // 11-03 and 11-04 are already stored
    for timestamp in ["2024-11-03 09:00:00", "2024-11-04 12:00:00"] {
        let record = ActivityRecord {
            moderator: "Alicja".to_string(),
            action: "Usunięto post".to_string(),
            details: "w temacie C".to_string(),
            timestamp: at(timestamp),
        };
        store.upsert(&record, ModScope::Active).unwrap();
    }

    let summary = run_activity_sync(
        &config,
        window("2024-11-01", "2024-11-08"),
        ModScope::Active,
        &mut store,
    )
    .await
    .unwrap();

    assert_eq!(
        summary.missing,
        vec![
            window("2024-11-01", "2024-11-02"),
            window("2024-11-05", "2024-11-08")
        ]
    );
    // 11-01..02: two rows; 11-05..08: two rows, Bartek is not in the roster
    assert_eq!(summary.scraped, 4);
    assert_eq!(summary.kept, 3);
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.duplicates(), 0);

    assert_eq!(store.count(&ActivityFilter::default()).unwrap(), 5);
    let spam = store
        .find(&ActivityFilter {
            range: Some(DateRange::single(date("2024-11-07"))),
            ..ActivityFilter::default()
        })
        .unwrap();
    assert_eq!(spam.len(), 1);
    assert_eq!(spam[0].record.action, "Usunięto post");
    assert_eq!(spam[0].mods_scope, ModScope::Active);
}

#[tokio::test]
async fn test_sync_skips_network_when_covered() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let mut store = SqliteStore::open_in_memory().unwrap();
    let record = ActivityRecord {
        moderator: "Alicja".to_string(),
        action: "Usunięto post".to_string(),
        details: String::new(),
        timestamp: at("2024-11-03 10:00:00"),
    };
    store.upsert(&record, ModScope::All).unwrap();

    let summary = run_activity_sync(
        &config,
        DateRange::single(date("2024-11-03")),
        ModScope::All,
        &mut store,
    )
    .await
    .unwrap();

    assert!(summary.missing.is_empty());
    assert_eq!(summary.scraped, 0);
}

#[tokio::test]
async fn test_resync_upserts_nothing_new() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_header_api(&server).await;
    mount_login(&server, LOGGED_IN_PAGE).await;
    mount_log_page(
        &server,
        "0",
        log_page(&[
            log_row("Alicja", "Usunięto post", "w temacie A", "6 lis 2024, 10:00"),
            log_row("Bartek", "Usunięto post", "w temacie B", "1 lis 2024, 11:00"),
        ]),
    )
    .await;

    let config = test_config(&server, dir.path());
    let mut store = SqliteStore::open_in_memory().unwrap();

    // 11-05 has no rows, so the window is crawled both times
    let requested = window("2024-11-05", "2024-11-06");
    let first = run_activity_sync(&config, requested, ModScope::All, &mut store)
        .await
        .unwrap();
    let second = run_activity_sync(&config, requested, ModScope::All, &mut store)
        .await
        .unwrap();

    assert_eq!(first.inserted, 1);
    assert_eq!(second.missing, vec![window("2024-11-05", "2024-11-05")]);
    assert_eq!(store.count(&ActivityFilter::default()).unwrap(), 1);
}
