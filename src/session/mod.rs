//! Authenticated forum sessions
//!
//! This module contains everything needed to talk to the forum as a logged-in user:
//! - HTTP client construction (proxy, cookie jar, timeouts)
//! - The rotating pool of request identities
//! - The GET/POST login handshake

mod client;
mod headers;
mod login;

pub use client::build_http_client;
pub use headers::{fallback_header, with_identity, HeaderPool, FALLBACK_USER_AGENTS, REFERRERS};
pub use login::{ForumSession, LoginError};
