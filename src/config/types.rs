use serde::Deserialize;

/// Main configuration structure for Forum-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub forum: ForumConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub topics: TopicsConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub membership: MembershipConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Site location and login form conventions
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Base URL every relative link and path is resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the main forum index, relative to the base URL
    #[serde(rename = "main-forum-path", default)]
    pub main_forum_path: String,

    /// Path of the login page, relative to the base URL
    #[serde(rename = "login-path", default = "default_login_path")]
    pub login_path: String,

    /// `id` attribute of the login `<form>`
    #[serde(rename = "login-form-id", default = "default_login_form_id")]
    pub login_form_id: String,

    /// Strings whose presence in the post-login page proves the login worked
    #[serde(rename = "logout-markers", default = "default_logout_markers")]
    pub logout_markers: Vec<String>,

    /// CSS selector of the inline error box shown on a rejected login
    #[serde(rename = "login-error-selector", default = "default_login_error_selector")]
    pub login_error_selector: String,

    /// Directory for login page snapshots; disabled when absent
    #[serde(rename = "snapshot-dir", default)]
    pub snapshot_dir: Option<String>,
}

/// Forum account used by the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,

    /// Falls back to the `FORUM_PASSWORD` environment variable when absent
    #[serde(default)]
    pub password: Option<String>,
}

/// Outbound network settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// SOCKS (or HTTP) proxy all traffic is routed through
    pub proxy_url: Option<String>,

    /// External service returning a random `user-agent`; static fallbacks when absent
    pub header_api_url: Option<String>,

    /// Number of headers to prefetch into the pool
    pub header_count: usize,

    /// Simultaneous in-flight requests per worker; never above `header_count`
    pub max_concurrent_requests: usize,

    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            header_api_url: Some("https://api.apicagent.com".to_string()),
            header_count: 100,
            max_concurrent_requests: 100,
            request_timeout_secs: 30,
        }
    }
}

/// Retry policies for the three kinds of network operation
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    pub fetch_attempts: u32,
    pub fetch_delay_ms: u64,
    pub fetch_backoff: f64,
    pub login_attempts: u32,
    pub login_delay_ms: u64,
    pub roster_attempts: u32,
    pub roster_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            fetch_attempts: 3,
            fetch_delay_ms: 2_000,
            fetch_backoff: 1.5,
            login_attempts: 3,
            login_delay_ms: 8_000,
            roster_attempts: 3,
            roster_delay_ms: 4_000,
        }
    }
}

/// Forum-tree crawl settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TopicsConfig {
    /// Log each worker in before crawling
    pub authenticate: bool,

    /// Subforum anchors on the main forum page
    pub subforum_selector: String,

    /// Sub-subforum anchors on a subforum page
    pub sub_subforum_selector: String,

    /// Topic anchors on a topic list page
    pub topic_selector: String,

    /// Textual "next page" anchor used inside sub-subforums
    pub next_selector: String,

    /// Icon "next page" anchor used for a subforum's own topics
    pub next_icon_selector: String,

    /// Subforums whose title contains any of these are skipped
    pub excluded_subforum_titles: Vec<String>,

    /// Sub-subforums whose title contains any of these are skipped
    pub excluded_sub_subforum_titles: Vec<String>,

    /// URLs containing any of these are never fetched
    pub excluded_urls: Vec<String>,

    /// Category assigned to topics living directly under a subforum
    pub general_category: String,

    /// Letter order used when sorting categories and titles
    pub collation_alphabet: String,

    pub output_dir: String,
    pub archive_path: String,
    pub pid_file: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            authenticate: true,
            subforum_selector: "a.forumtitle".to_string(),
            sub_subforum_selector: "a.subforum".to_string(),
            topic_selector: "a.topictitle".to_string(),
            next_selector: "li.next a".to_string(),
            next_icon_selector: "a.button-icon-only[rel='next']".to_string(),
            excluded_subforum_titles: Vec::new(),
            excluded_sub_subforum_titles: Vec::new(),
            excluded_urls: Vec::new(),
            general_category: "ogólne".to_string(),
            collation_alphabet: crate::output::POLISH_ALPHABET.to_string(),
            output_dir: "files".to_string(),
            archive_path: "results/topics.tar".to_string(),
            pid_file: "topics.pid".to_string(),
        }
    }
}

/// Moderator activity log settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ActivityConfig {
    /// Log path relative to the base URL; the row offset is appended to it
    pub logs_path: String,
    pub page_size: u32,

    /// Class of one log row
    pub row_class: String,

    /// Class of the block holding the action phrase and details
    pub action_class: String,

    /// Class of the labelled blocks (moderator, time)
    pub label_class: String,

    /// Class of the moderator profile link
    pub member_link_class: String,

    pub moderator_label: String,
    pub time_label: String,

    /// IANA timezone the forum prints its timestamps in
    pub timezone: String,

    /// Known action phrases, matched by longest prefix
    pub base_actions: Vec<String>,
    pub fallback_action: String,

    /// Store the base action rather than the full phrase
    pub normalize_actions: bool,

    pub pid_file: String,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            logs_path: "mcp.php?i=logs&mode=front&start=".to_string(),
            page_size: 15,
            row_class: "log-row".to_string(),
            action_class: "log-action".to_string(),
            label_class: "log-field".to_string(),
            member_link_class: "username".to_string(),
            moderator_label: "Opinie o użytkowniku:".to_string(),
            time_label: "Czas:".to_string(),
            timezone: "Europe/Warsaw".to_string(),
            base_actions: default_base_actions(),
            fallback_action: "Inne akcje".to_string(),
            normalize_actions: true,
            pid_file: "activity.pid".to_string(),
        }
    }
}

/// What an empty group roster means for an `active` scoped crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyRosterPolicy {
    /// No active moderators, so no records survive the filter
    DropAll,
    /// Skip the filter and keep every record
    KeepAll,
}

/// What an empty roster page after the first one means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyLaterPage {
    /// Treat it like an empty first page: retry the roster, then give up empty
    Fail,
    /// The roster ended; keep the members read so far
    End,
}

/// Group roster settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MembershipConfig {
    /// Group path relative to the base URL; the group id is appended to it
    pub group_path: String,
    pub group_id: Option<u32>,

    /// Roster offsets fetched; pagination is not followed beyond these
    pub offsets: Vec<u32>,

    pub member_block_class: String,
    pub member_link_class: String,
    pub empty_roster_policy: EmptyRosterPolicy,
    pub empty_later_page: EmptyLaterPage,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            group_path: "memberlist.php?mode=group&g=".to_string(),
            group_id: None,
            offsets: vec![0, 15],
            member_block_class: "member-card".to_string(),
            member_link_class: "username".to_string(),
            empty_roster_policy: EmptyRosterPolicy::DropAll,
            empty_later_page: EmptyLaterPage::Fail,
        }
    }
}

/// Persistent store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "forum_harvest.db".to_string(),
        }
    }
}

fn default_login_path() -> String {
    "ucp.php?mode=login".to_string()
}

fn default_login_form_id() -> String {
    "login".to_string()
}

fn default_logout_markers() -> Vec<String> {
    vec![
        "ucp.php?mode=logout".to_string(),
        "Wyloguj".to_string(),
        "Log out".to_string(),
    ]
}

fn default_login_error_selector() -> String {
    "div.error".to_string()
}

fn default_base_actions() -> Vec<String> {
    [
        "Edytowano post",
        "Odrzucono post",
        "Odrzucono temat",
        "Połączono posty",
        "Usunięto post",
        "Usunięto zgłoszenie",
        "Zaakceptowano post",
        "Zamknięto zgłoszenie",
        "Wysłano ostrzeżenie użytkownikowi",
        "Zablokowano użytkownika",
        "Przeniesiono temat",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Parsed base URL of the forum
    pub fn base_url(&self) -> Result<url::Url, url::ParseError> {
        url::Url::parse(&self.forum.base_url)
    }

    /// Resolves a configured path against the base URL
    pub fn forum_url(&self, path: &str) -> Result<url::Url, url::ParseError> {
        self.base_url()?.join(path)
    }

    /// Password from the config file, or from `FORUM_PASSWORD`
    pub fn password(&self) -> Option<String> {
        self.credentials
            .password
            .clone()
            .or_else(|| std::env::var("FORUM_PASSWORD").ok())
    }
}
