//! Two-step form login
//!
//! # Handshake
//!
//! 1. GET the login page and extract every field of the login form
//! 2. Replace `username`/`password` with the configured credentials
//! 3. POST the fields back to the login URL with `Referer` and `Origin` set
//! 4. Look for a logout marker in the resulting page
//!
//! Network failures and rejected logins are retried with a fixed delay. A page
//! without the login form ends the attempt immediately.

use crate::config::Config;
use crate::parser::login::sanitize_fields;
use crate::parser::{login_error_message, login_succeeded, parse_login_form, ParseError};
use crate::retry::RetryPolicy;
use crate::session::headers::{with_identity, HeaderPool};
use reqwest::header::{ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Why a login attempt did not produce a session
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Login form '{0}' not found on the login page")]
    FormNotFound(String),

    #[error("Network error during login: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Login rejected: {reason}")]
    Rejected { reason: String },

    #[error("No password configured (set credentials.password or FORUM_PASSWORD)")]
    MissingPassword,

    #[error("Invalid login URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Login page could not be parsed: {0}")]
    Parse(ParseError),

    #[error("Login failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<LoginError>,
    },
}

impl LoginError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Rejected { .. })
    }
}

impl From<ParseError> for LoginError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::FormNotFound(id) => Self::FormNotFound(id),
            other => Self::Parse(other),
        }
    }
}

/// An HTTP client bound to one cookie jar, with the identities it sends
///
/// A session built by [`ForumSession::login`] has been verified as logged in;
/// [`ForumSession::anonymous`] builds one for public pages only.
#[derive(Debug, Clone)]
pub struct ForumSession {
    client: Client,
    headers: HeaderPool,
    base_url: Url,
    authenticated: bool,
}

impl ForumSession {
    /// A session that never logged in
    pub fn anonymous(client: Client, headers: HeaderPool, base_url: Url) -> Self {
        Self {
            client,
            headers,
            base_url,
            authenticated: false,
        }
    }

    /// Logs in with the configured credentials, retrying per the login policy
    ///
    /// # Arguments
    ///
    /// * `client` - A client with a fresh cookie jar; it holds the session cookies afterwards
    /// * `headers` - Identities used for the handshake and every later request
    /// * `config` - Forum location, login conventions, credentials and retry policy
    ///
    /// # Returns
    ///
    /// * `Ok(ForumSession)` - A verified, logged-in session
    /// * `Err(LoginError)` - The form was missing, or every attempt failed
    pub async fn login(
        client: Client,
        headers: HeaderPool,
        config: &Config,
    ) -> Result<Self, LoginError> {
        let password = config.password().ok_or(LoginError::MissingPassword)?;
        let base_url = config.base_url()?;
        let login_url = config.forum_url(&config.forum.login_path)?;
        let policy = RetryPolicy::login(&config.retry);

        let handshake = Handshake {
            client: &client,
            headers: &headers,
            config,
            login_url: &login_url,
            origin: base_url.origin().ascii_serialization(),
            username: &config.credentials.username,
            password: &password,
        };
        let handshake = &handshake;

        policy
            .run("login", move || handshake.attempt(), LoginError::is_retryable)
            .await
            .map_err(|e| {
                if e.is_retryable() {
                    LoginError::Exhausted {
                        attempts: policy.max_attempts,
                        last: Box::new(e),
                    }
                } else {
                    e
                }
            })?;

        tracing::info!("Login successful as '{}'", config.credentials.username);

        Ok(Self {
            client,
            headers,
            base_url,
            authenticated: true,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn headers(&self) -> &HeaderPool {
        &self.headers
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// A GET request carrying a freshly chosen identity
    pub fn get(&self, url: &Url) -> RequestBuilder {
        with_identity(self.client.get(url.clone()), &self.headers.choose())
    }
}

/// Everything one login attempt needs
struct Handshake<'a> {
    client: &'a Client,
    headers: &'a HeaderPool,
    config: &'a Config,
    login_url: &'a Url,
    origin: String,
    username: &'a str,
    password: &'a str,
}

impl Handshake<'_> {
    async fn attempt(&self) -> Result<(), LoginError> {
        let forum = &self.config.forum;
        let header = self.headers.choose();
        let snapshot_dir = forum.snapshot_dir.as_deref().map(Path::new);

        tracing::debug!("Attempting to log in at {}", self.login_url);
        let login_page = with_identity(self.client.get(self.login_url.clone()), &header)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        write_snapshot(snapshot_dir, "login_page.html", &login_page);

        let form = parse_login_form(&login_page, &forum.login_form_id)?;
        let fields = form.with_credentials(self.username, self.password);
        tracing::debug!("Submitting login form: {:?}", sanitize_fields(&fields));

        let post_login_page = self
            .client
            .post(self.login_url.clone())
            .header(USER_AGENT, header.user_agent.as_str())
            .header(REFERER, self.login_url.as_str())
            .header(ORIGIN, self.origin.as_str())
            .form(&fields)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        write_snapshot(snapshot_dir, "post_login_page.html", &post_login_page);

        if login_succeeded(&post_login_page, &forum.logout_markers) {
            return Ok(());
        }

        let reason = login_error_message(&post_login_page, &forum.login_error_selector)?
            .unwrap_or_else(|| "no error message found".to_string());
        Err(LoginError::Rejected { reason })
    }
}

/// Saves a page for diagnosis; failures are only logged
fn write_snapshot(dir: Option<&Path>, name: &str, body: &str) {
    let Some(dir) = dir else {
        return;
    };
    let path: PathBuf = dir.join(name);
    let result = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, body));
    if let Err(e) = result {
        tracing::warn!("Failed to write snapshot {}: {}", path.display(), e);
    }
}
