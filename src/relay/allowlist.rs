//! Sender allow-list enforcement.
//!
//! Entries are decided once at configuration-load time: a `/`-delimited
//! entry becomes a compiled pattern, anything else a case-insensitive
//! literal address. An empty list disables the feature entirely.

use regex::Regex;

use crate::config::ConfigError;

/// Subject prefix applied when a blocked sender's mail is redirected to
/// the abuse address.
pub const REJECTED_SUBJECT_PREFIX: &str = "mail rejected: ";

/// One configured allow-list entry.
#[derive(Debug, Clone)]
pub enum AllowListEntry {
    /// Exact address, compared case-insensitively.
    Literal(String),
    /// Pattern matched against the full sender address.
    Pattern(Regex),
}

impl AllowListEntry {
    /// Parses a configured entry. Entries wrapped in `/` become
    /// patterns; everything else is a literal address.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        match entry.strip_prefix('/') {
            Some(body) => {
                let body = body.strip_suffix('/').unwrap_or(body);
                Regex::new(body)
                    .map(AllowListEntry::Pattern)
                    .map_err(|source| ConfigError::AllowListPattern {
                        entry: entry.to_string(),
                        source,
                    })
            }
            None => Ok(AllowListEntry::Literal(entry.to_string())),
        }
    }

    fn matches(&self, sender: &str) -> bool {
        match self {
            AllowListEntry::Literal(address) => address.eq_ignore_ascii_case(sender),
            AllowListEntry::Pattern(pattern) => pattern.is_match(sender),
        }
    }
}

/// The configured sender allow-list, read-only during a run.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<AllowListEntry>,
}

impl AllowList {
    /// Compiles the configured entries, in order.
    pub fn from_entries(entries: &[String]) -> Result<Self, ConfigError> {
        let entries = entries
            .iter()
            .map(|entry| AllowListEntry::parse(entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Whether the feature is disabled (no entries configured).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decides whether mail from `sender` may be forwarded to its
    /// targets. Entries are checked in configured order, first match
    /// wins; an empty list allows every sender.
    pub fn permits(&self, sender: &str) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|entry| entry.matches(sender))
    }
}
