//! Shared fixtures for the integration tests
//!
//! Every test gets its own mock forum and a temporary directory for output
//! files, the database and PID files.

#![allow(dead_code)]

use forum_harvest::config::{parse_config, Config};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const LOGIN_PAGE: &str = r#"<html><body>
    <form id="login" method="post" action="./ucp.php?mode=login">
        <input type="text" name="username" value="">
        <input type="password" name="password" value="">
        <input type="hidden" name="sid" value="abc123">
        <input type="hidden" name="form_token" value="tok">
        <button type="submit" name="login" value="Zaloguj">Zaloguj</button>
    </form>
</body></html>"#;

pub const LOGGED_IN_PAGE: &str = r#"<html><body>
    <a href="./ucp.php?mode=logout&sid=abc123">Wyloguj [ crawler ]</a>
</body></html>"#;

pub const REJECTED_PAGE: &str = r#"<html><body>
    <div class="error">Podano nieprawidłowe hasło.</div>
</body></html>"#;

/// Matches requests whose query string is exactly `expected`
pub struct QueryIs(pub &'static str);

impl Match for QueryIs {
    fn matches(&self, request: &Request) -> bool {
        request.url.query().unwrap_or("") == self.0
    }
}

/// Builds a validated configuration pointing at the mock forum
pub fn test_config(server: &MockServer, dir: &Path) -> Config {
    let base = server.uri();
    let dir = dir.display();
    let content = format!(
        r#"
[forum]
base-url = "{base}/"
main-forum-path = "index.php"
login-path = "ucp.php?mode=login"

[credentials]
username = "crawler"
password = "secret"

[network]
header-api-url = "{base}/ua"
header-count = 2
max-concurrent-requests = 2
request-timeout-secs = 5

[retry]
fetch-attempts = 2
fetch-delay-ms = 0
fetch-backoff = 1.0
login-attempts = 2
login-delay-ms = 0
roster-attempts = 2
roster-delay-ms = 0

[topics]
excluded-subforum-titles = ["Kosz"]
output-dir = "{dir}/files"
archive-path = "{dir}/results/topics.tar"
pid-file = "{dir}/topics.pid"

[activity]
pid-file = "{dir}/activity.pid"

[membership]
group-id = 7

[storage]
database-path = "{dir}/activity.db"
"#
    );
    parse_config(&content).expect("test config should be valid")
}

/// Serves the user-agent API
pub async fn mount_header_api(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ua"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "user-agent": "TestAgent/1.0" })),
        )
        .mount(server)
        .await;
}

/// Serves the login page and answers the form POST with `post_response`
pub async fn mount_login(server: &MockServer, post_response: &str) {
    Mock::given(method("GET"))
        .and(path("/ucp.php"))
        .and(query_param("mode", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ucp.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(post_response))
        .mount(server)
        .await;
}

/// Serves an HTML page for a path and exact query string
pub async fn mount_page(server: &MockServer, page_path: &str, query: &'static str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .and(QueryIs(query))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// One activity log row in the forum's markup
pub fn log_row(moderator: &str, action: &str, details: &str, time: &str) -> String {
    format!(
        r#"<div class="log-row">
            <div class="log-action"><strong>{action}</strong> {details}</div>
            <div class="log-field"><span>Opinie o użytkowniku:</span> <a class="username" href="./memberlist.php?mode=viewprofile&amp;un={moderator}">{moderator}</a></div>
            <div class="log-field"><span>Czas:</span> {time}</div>
        </div>"#
    )
}

/// An activity log page holding the given rows
pub fn log_page(rows: &[String]) -> String {
    format!("<html><body><div id=\"logs\">{}</div></body></html>", rows.concat())
}
