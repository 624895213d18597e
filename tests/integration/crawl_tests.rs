//! Integration tests for the forum-tree crawl
//!
//! These tests use wiremock to serve a small forum and run the topic crawl
//! end-to-end: login, traversal, topic files and the archive.

mod common;

use common::{mount_header_api, mount_login, mount_page, test_config, LOGGED_IN_PAGE};
use forum_harvest::crawler::{run_topic_crawl, ForumTreeCrawler, PageFetcher};
use forum_harvest::retry::RetryPolicy;
use forum_harvest::session::{build_http_client, ForumSession, HeaderPool};
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn index_page() -> String {
    r#"<html><body>
        <a class="forumtitle" href="./viewforum.php?f=1">Strefa Gier</a>
        <a class="forumtitle" href="./viewforum.php?f=2">Archiwum</a>
        <a class="forumtitle" href="./viewforum.php?f=3">Kosz</a>
    </body></html>"#
        .to_string()
}

/// Mounts a forum with two crawlable subforums
///
/// "Strefa Gier" has two pages of general topics (one title repeated with a
/// different case) and a sub-subforum whose second page links back to the first.
async fn mount_forum(server: &MockServer) {
    mount_page(server, "/index.php", "", index_page()).await;

    mount_page(
        server,
        "/viewforum.php",
        "f=1",
        r#"<html><body>
            <a class="subforum" href="./viewforum.php?f=11">Gry planszowe</a>
            <a class="topictitle" href="./viewtopic.php?t=1">Regulamin</a>
            <a class="topictitle" href="./viewtopic.php?t=2">Witamy</a>
            <a class="button-icon-only" rel="next" href="./viewforum.php?f=1&amp;start=25">»</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/viewforum.php",
        "f=1&start=25",
        r#"<html><body>
            <a class="topictitle" href="./viewtopic.php?t=3">REGULAMIN</a>
            <a class="topictitle" href="./viewtopic.php?t=4">Ankiety</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/viewforum.php",
        "f=11",
        r#"<html><body>
            <a class="topictitle" href="./viewtopic.php?t=11">Szachy</a>
            <a class="topictitle" href="./viewtopic.php?t=12">Warcaby</a>
            <a class="topictitle" href="./viewtopic.php?t=13">Łamigłówki</a>
            <ul><li class="next"><a href="./viewforum.php?f=11&amp;start=25">Dalej</a></li></ul>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/viewforum.php",
        "f=11&start=25",
        r#"<html><body>
            <a class="topictitle" href="./viewtopic.php?t=14">Anagramy</a>
            <ul><li class="next"><a href="./viewforum.php?f=11">Dalej</a></li></ul>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/viewforum.php",
        "f=2",
        r#"<html><body>
            <a class="topictitle" href="./viewtopic.php?t=21">Stare dzieje</a>
        </body></html>"#
            .to_string(),
    )
    .await;
}

#[tokio::test]
async fn test_topic_crawl_writes_files_and_archive() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_header_api(&server).await;
    mount_login(&server, LOGGED_IN_PAGE).await;
    mount_forum(&server).await;

    // The excluded subforum is never visited
    Mock::given(method("GET"))
        .and(path("/viewforum.php"))
        .and(common::QueryIs("f=3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let summary = run_topic_crawl(Arc::new(config)).await.unwrap();

    assert_eq!(summary.subforums, 2);
    assert_eq!(summary.files.len(), 2);
    // 4 general + 4 sub-subforum topics in "Strefa Gier", 1 in "Archiwum"
    assert_eq!(summary.topics, 9);

    let base = server.uri();
    let strefa = std::fs::read_to_string(dir.path().join("files/strefa_gier.txt")).unwrap();
    let expected = format!(
        "\n[Gry planszowe]\n\
         [*][url={base}/viewtopic.php?t=14]Anagramy[/url]\n\
         [*][url={base}/viewtopic.php?t=13]Łamigłówki[/url]\n\
         [*][url={base}/viewtopic.php?t=11]Szachy[/url]\n\
         [*][url={base}/viewtopic.php?t=12]Warcaby[/url]\n\
         \n\
         \n[ogólne]\n\
         [*][url={base}/viewtopic.php?t=4]Ankiety[/url]\n\
         [*][url={base}/viewtopic.php?t=1]Regulamin[/url]\n\
         [*][url={base}/viewtopic.php?t=2]Witamy[/url]\n"
    );
    assert_eq!(strefa, expected);

    let archiwum = std::fs::read_to_string(dir.path().join("files/archiwum.txt")).unwrap();
    assert!(archiwum.contains("[*][url="));
    assert!(archiwum.contains("]Stare dzieje[/url]"));

    let mut archive = tar::Archive::new(File::open(dir.path().join("results/topics.tar")).unwrap());
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|entry| entry.unwrap().path().unwrap().display().to_string())
        .collect();
    assert!(names.contains(&"files/strefa_gier.txt".to_string()));
    assert!(names.contains(&"files/archiwum.txt".to_string()));
}

#[tokio::test]
async fn test_topic_crawl_wipes_stale_output() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_header_api(&server).await;
    mount_login(&server, LOGGED_IN_PAGE).await;
    mount_forum(&server).await;

    let stale = dir.path().join("files/old_subforum.txt");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "stale").unwrap();

    let config = test_config(&server, dir.path());
    run_topic_crawl(Arc::new(config)).await.unwrap();

    assert!(!stale.exists());
}

#[tokio::test]
async fn test_main_page_failure_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_header_api(&server).await;
    mount_login(&server, LOGGED_IN_PAGE).await;

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let result = run_topic_crawl(Arc::new(config)).await;

    assert!(result.is_err());
    assert!(!dir.path().join("results/topics.tar").exists());
}

#[tokio::test]
async fn test_login_failure_fails_the_run() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_header_api(&server).await;
    mount_forum(&server).await;

    Mock::given(method("GET"))
        .and(path("/ucp.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let result = run_topic_crawl(Arc::new(config)).await;

    assert!(result.is_err());
    assert!(!dir.path().join("results/topics.tar").exists());
}

#[tokio::test]
async fn test_anonymous_crawl_skips_login() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    mount_header_api(&server).await;
    mount_forum(&server).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server, dir.path());
    config.topics.authenticate = false;
    let summary = run_topic_crawl(Arc::new(config)).await.unwrap();

    assert_eq!(summary.files.len(), 2);
}

#[tokio::test]
async fn test_failed_branch_does_not_affect_siblings() {
    let server = MockServer::start().await;
    mount_page(&server, "/index.php", "", index_page()).await;
    mount_page(
        &server,
        "/viewforum.php",
        "f=2",
        r#"<a class="topictitle" href="./viewtopic.php?t=21">Stare dzieje</a>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/viewforum.php"))
        .and(common::QueryIs("f=1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let base = url::Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = build_http_client(&Default::default()).unwrap();
    let session = ForumSession::anonymous(client, HeaderPool::fallback(2), base.clone());
    let fetcher = PageFetcher::new(
        session,
        2,
        Vec::new(),
        RetryPolicy::fixed(1, Duration::ZERO),
    );
    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path());
    let crawler = ForumTreeCrawler::new(fetcher, Arc::new(config.topics.clone()));

    let subforums = crawler
        .extract_subforum_links(&base.join("index.php").unwrap())
        .await
        .unwrap();
    assert_eq!(subforums.len(), 2);

    let broken = crawler.crawl_subforum(&subforums[0]).await;
    let healthy = crawler.crawl_subforum(&subforums[1]).await;

    assert!(broken.is_empty());
    assert_eq!(healthy.len(), 1);
    assert_eq!(healthy[0].subforum_category, "ogólne");
}
