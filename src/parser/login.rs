//! Login page parsing and post-login verification

use super::{element_text, selector, ParseError, ParseResult};
use scraper::Html;

/// Name/value pairs of every `input` and `button` inside the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Replaces any `username`/`password` entries with the given credentials
    ///
    /// All other fields, hidden tokens included, are kept verbatim and in order;
    /// the credentials are appended last.
    pub fn with_credentials(&self, username: &str, password: &str) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = self
            .fields
            .iter()
            .filter(|(name, _)| name != "username" && name != "password")
            .cloned()
            .collect();
        fields.push(("username".to_string(), username.to_string()));
        fields.push(("password".to_string(), password.to_string()));
        fields
    }
}

/// Copy of form fields safe to log
pub fn sanitize_fields(fields: &[(String, String)]) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(name, value)| {
            if name == "password" {
                (name.clone(), "******".to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// Extracts the login form's fields
///
/// # Arguments
///
/// * `html` - The login page body
/// * `form_id` - The `id` attribute of the login form
///
/// # Returns
///
/// * `Ok(LoginForm)` - Every named `input`/`button`, missing values as ""
/// * `Err(ParseError::FormNotFound)` - No form with that id on the page
pub fn parse_login_form(html: &str, form_id: &str) -> ParseResult<LoginForm> {
    let document = Html::parse_document(html);
    let form_selector = selector("form")?;
    let field_selector = selector("input, button")?;

    let form = document
        .select(&form_selector)
        .find(|form| form.value().attr("id") == Some(form_id))
        .ok_or_else(|| ParseError::FormNotFound(form_id.to_string()))?;

    let fields = form
        .select(&field_selector)
        .filter_map(|element| {
            let name = element.value().attr("name")?;
            let value = element.value().attr("value").unwrap_or("");
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    Ok(LoginForm { fields })
}

/// Whether the post-login page proves an authenticated session
pub fn login_succeeded(body: &str, logout_markers: &[String]) -> bool {
    logout_markers
        .iter()
        .filter(|marker| !marker.is_empty())
        .any(|marker| body.contains(marker.as_str()))
}

/// Text of the inline error box on a rejected login, if the page has one
pub fn login_error_message(html: &str, error_selector: &str) -> ParseResult<Option<String>> {
    let document = Html::parse_document(html);
    let error_selector = selector(error_selector)?;

    Ok(document
        .select(&error_selector)
        .next()
        .map(|element| element_text(&element))
        .filter(|text| !text.is_empty()))
}
