//! Group roster resolution and moderator scope filtering

use crate::config::{EmptyLaterPage, EmptyRosterPolicy, MembershipConfig};
use crate::model::{fold_name, ActivityRecord, Member, ModScope};
use crate::parser::{parse_member_cards, ParseError};
use crate::retry::RetryPolicy;
use crate::session::ForumSession;
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Why one pass over the roster pages failed
#[derive(Debug, Error)]
enum RosterError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no members found on page starting at {offset}")]
    Empty { offset: u32 },

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("invalid roster URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RosterError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Empty { .. })
    }
}

/// Which activity records survive the moderator scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Keep every record
    All,
    /// Keep records of moderators in the roster (case-folded, trimmed names)
    Active {
        names: HashSet<String>,
        empty_policy: EmptyRosterPolicy,
    },
}

impl ScopeFilter {
    /// Builds an `Active` filter from roster members
    pub fn active(members: &[Member], empty_policy: EmptyRosterPolicy) -> Self {
        Self::Active {
            names: members.iter().map(Member::folded_name).collect(),
            empty_policy,
        }
    }

    /// Whether records by this moderator are kept
    pub fn keeps(&self, moderator: &str) -> bool {
        match self {
            Self::All => true,
            Self::Active {
                names,
                empty_policy,
            } => {
                if names.is_empty() {
                    *empty_policy == EmptyRosterPolicy::KeepAll
                } else {
                    names.contains(&fold_name(moderator))
                }
            }
        }
    }

    /// Drops the records outside the scope
    pub fn apply(&self, records: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
        records
            .into_iter()
            .filter(|record| self.keeps(&record.moderator))
            .collect()
    }
}

/// Reads the moderator group roster
#[derive(Debug, Clone)]
pub struct MembershipResolver {
    session: ForumSession,
    settings: Arc<MembershipConfig>,
    policy: RetryPolicy,
}

impl MembershipResolver {
    pub fn new(session: ForumSession, settings: Arc<MembershipConfig>, policy: RetryPolicy) -> Self {
        Self {
            session,
            settings,
            policy,
        }
    }

    /// Roster page URL for a group and offset
    pub fn roster_url(&self, group_id: u32, offset: u32) -> Result<Url, url::ParseError> {
        self.session.base_url().join(&format!(
            "{}{}&start={}",
            self.settings.group_path, group_id, offset
        ))
    }

    /// Fetches the members of a group across the configured offsets
    ///
    /// The whole roster is retried when a request fails or a page is empty.
    /// With `empty-later-page = "end"`, an empty page after the first one ends
    /// the roster instead.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Member>)` - The members; empty when the roster stayed empty
    /// * `Err(HarvestError::RosterUnavailable)` - The roster could not be reached
    pub async fn get_members(&self, group_id: u32) -> Result<Vec<Member>, HarvestError> {
        let result = self
            .policy
            .run(
                "group roster",
                move || self.fetch_roster(group_id),
                RosterError::is_retryable,
            )
            .await;

        match result {
            Ok(members) => {
                tracing::info!("Found {} members in group {}", members.len(), group_id);
                Ok(members)
            }
            Err(RosterError::Empty { offset }) => {
                tracing::warn!(
                    "Group {} roster stayed empty (offset {}); no active moderators",
                    group_id,
                    offset
                );
                Ok(Vec::new())
            }
            Err(e) => Err(HarvestError::RosterUnavailable(e.to_string())),
        }
    }

    /// Resolves the filter for a requested scope
    pub async fn scope_filter(&self, scope: ModScope) -> Result<ScopeFilter, HarvestError> {
        match scope {
            ModScope::All => Ok(ScopeFilter::All),
            ModScope::Active => {
                let group_id = self.settings.group_id.ok_or_else(|| {
                    HarvestError::RosterUnavailable(
                        "membership.group-id is required for the 'active' scope".to_string(),
                    )
                })?;
                let members = self.get_members(group_id).await?;
                Ok(ScopeFilter::active(
                    &members,
                    self.settings.empty_roster_policy,
                ))
            }
        }
    }

    async fn fetch_roster(&self, group_id: u32) -> Result<Vec<Member>, RosterError> {
        let mut members = Vec::new();

        for &offset in &self.settings.offsets {
            let url = self.roster_url(group_id, offset)?;
            tracing::info!("Fetching group members from: {}", url);

            let network_error = |source| RosterError::Network {
                url: url.to_string(),
                source,
            };
            let html = self
                .session
                .get(&url)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(network_error)?
                .text()
                .await
                .map_err(network_error)?;

            let page = parse_member_cards(
                &html,
                &self.settings.member_block_class,
                &self.settings.member_link_class,
                self.session.base_url(),
            )?;

            if page.is_empty() {
                if members.is_empty() || self.settings.empty_later_page == EmptyLaterPage::Fail {
                    return Err(RosterError::Empty { offset });
                }
                tracing::debug!("Roster ends before offset {}", offset);
                break;
            }
            members.extend(page);
        }

        Ok(members)
    }
}
