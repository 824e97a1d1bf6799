//! Relay settings and configuration types.
//!
//! Settings are loaded from a JSON file (`config.json` by default) at the
//! start of every run. Validation of the fatal preconditions happens in
//! [`Settings::validate`] before any network connection is attempted.

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Account;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal: the process reports them and exits before
/// connecting anywhere.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the settings schema.
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The per-account lists do not line up.
    #[error(
        "target account lists must have equal lengths \
         (users: {users}, passwords: {passwords}, sender addresses: {senders})"
    )]
    MismatchedAccountLists {
        /// Number of configured usernames.
        users: usize,
        /// Number of configured passwords.
        passwords: usize,
        /// Number of configured sender addresses.
        senders: usize,
    },

    /// No outbound account is configured.
    #[error("at least one target account must be configured")]
    NoAccounts,

    /// An allow-list is configured without an abuse fallback address.
    #[error("allowed_senders requires abuse_address to be set")]
    MissingAbuseAddress,

    /// The source mailbox only supports implicit TLS.
    #[error("source mailbox supports security \"tls\" only")]
    MailboxStartTls,

    /// A `/`-delimited allow-list entry is not a valid pattern.
    #[error("invalid allow-list pattern {entry:?}: {source}")]
    AllowListPattern {
        /// The offending entry as configured.
        entry: String,
        /// Pattern compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Connection security for a mail server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Implicit TLS on connect.
    Tls,
    /// Plain connection upgraded via STARTTLS.
    StartTls,
}

impl Default for Security {
    fn default() -> Self {
        Security::Tls
    }
}

/// Top-level relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Source mailbox connection.
    pub source: SourceSettings,
    /// Outbound target accounts and rotation behavior.
    pub target: TargetSettings,
    /// Sender allow-list; empty means every sender is allowed.
    #[serde(default)]
    pub allowed_senders: Vec<String>,
    /// Where mail from blocked senders is redirected.
    #[serde(default)]
    pub abuse_address: Option<String>,
    /// Overall wall-clock budget for one run, in seconds.
    #[serde(default)]
    pub time_budget_secs: Option<u64>,
}

/// Source mailbox connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port (typically 993).
    pub port: u16,
    /// Login username.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Folder to process.
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Connection security; only implicit TLS is supported here.
    #[serde(default)]
    pub security: Security,
}

/// Outbound SMTP settings: one server, one or more accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port (typically 465 for TLS, 587 for STARTTLS).
    pub port: u16,
    /// Connection security.
    #[serde(default)]
    pub security: Security,
    /// Domain under which alias addresses are reconstructed
    /// (`<tag>@<domain>`).
    pub domain: String,
    /// Login usernames, aligned with `passwords` and `sender_addresses`.
    pub users: Vec<String>,
    /// Login passwords.
    pub passwords: Vec<String>,
    /// Sender addresses used while the matching account is active.
    pub sender_addresses: Vec<String>,
    /// Sends per account before rotating; 0 or absent rotates after
    /// every message.
    #[serde(default)]
    pub reuse_limit: Option<u32>,
    /// Pause after a full rotation cycle, in seconds; 0 disables.
    #[serde(default)]
    pub cycle_pause_secs: u64,
}

fn default_folder() -> String {
    "INBOX".to_string()
}

impl Settings {
    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    /// Checks the fatal preconditions of a run.
    ///
    /// Mismatched account lists, a missing abuse fallback for a non-empty
    /// allow-list, and an unsupported mailbox security mode are all
    /// reported here, before any connection is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let users = self.target.users.len();
        let passwords = self.target.passwords.len();
        let senders = self.target.sender_addresses.len();

        if users != passwords || users != senders {
            return Err(ConfigError::MismatchedAccountLists {
                users,
                passwords,
                senders,
            });
        }
        if users == 0 {
            return Err(ConfigError::NoAccounts);
        }
        if !self.allowed_senders.is_empty()
            && self.abuse_address.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::MissingAbuseAddress);
        }
        if self.source.security != Security::Tls {
            return Err(ConfigError::MailboxStartTls);
        }
        Ok(())
    }

    /// Builds the fixed account sequence from the aligned target lists.
    ///
    /// Call [`validate`](Self::validate) first; this assumes the lists
    /// line up.
    pub fn accounts(&self) -> Vec<Account> {
        self.target
            .users
            .iter()
            .zip(&self.target.passwords)
            .zip(&self.target.sender_addresses)
            .enumerate()
            .map(|(index, ((user, password), sender))| {
                Account::new(user.clone(), password.clone(), sender.clone(), index)
            })
            .collect()
    }

    /// Reuse limit with the `0 means disabled` convention applied.
    pub fn reuse_limit(&self) -> Option<NonZeroU32> {
        self.target.reuse_limit.and_then(NonZeroU32::new)
    }

    /// Pause inserted after a full rotation cycle.
    pub fn cycle_pause(&self) -> Duration {
        Duration::from_secs(self.target.cycle_pause_secs)
    }

    /// Overall time budget for the run, if configured.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_json() -> String {
        r#"{
            "source": {
                "host": "imap.example.com",
                "port": 993,
                "user": "catchall@example.com",
                "password": "secret"
            },
            "target": {
                "host": "smtp.example.com",
                "port": 465,
                "domain": "out.example.com",
                "users": ["a@example.com", "b@example.com"],
                "passwords": ["pa", "pb"],
                "sender_addresses": ["relay-a@example.com", "relay-b@example.com"],
                "reuse_limit": 3,
                "cycle_pause_secs": 5
            },
            "allowed_senders": ["boss@example.com"],
            "abuse_address": "abuse@example.com"
        }"#
        .to_string()
    }

    #[test]
    fn parses_full_config() {
        let settings: Settings = serde_json::from_str(&sample_json()).unwrap();
        assert_eq!(settings.source.folder, "INBOX");
        assert_eq!(settings.source.security, Security::Tls);
        assert_eq!(settings.target.domain, "out.example.com");
        assert_eq!(settings.target.users.len(), 2);
        assert_eq!(settings.reuse_limit(), NonZeroU32::new(3));
        assert_eq!(settings.cycle_pause(), Duration::from_secs(5));
        assert!(settings.time_budget().is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn accounts_follow_list_order() {
        let settings: Settings = serde_json::from_str(&sample_json()).unwrap();
        let accounts = settings.accounts();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].username, "a@example.com");
        assert_eq!(accounts[0].sender_address, "relay-a@example.com");
        assert_eq!(accounts[0].index, 0);
        assert_eq!(accounts[1].index, 1);
    }

    #[test]
    fn mismatched_lists_are_fatal() {
        let mut settings: Settings = serde_json::from_str(&sample_json()).unwrap();
        settings.target.passwords.pop();
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MismatchedAccountLists {
                users: 2,
                passwords: 1,
                senders: 2
            }
        ));
    }

    #[test]
    fn empty_account_lists_are_fatal() {
        let mut settings: Settings = serde_json::from_str(&sample_json()).unwrap();
        settings.target.users.clear();
        settings.target.passwords.clear();
        settings.target.sender_addresses.clear();
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::NoAccounts
        ));
    }

    #[test]
    fn allow_list_requires_abuse_address() {
        let mut settings: Settings = serde_json::from_str(&sample_json()).unwrap();
        settings.abuse_address = None;
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::MissingAbuseAddress
        ));

        // An empty allow-list does not need the fallback.
        settings.allowed_senders.clear();
        settings.validate().unwrap();
    }

    #[test]
    fn source_starttls_is_rejected() {
        let mut settings: Settings = serde_json::from_str(&sample_json()).unwrap();
        settings.source.security = Security::StartTls;
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::MailboxStartTls
        ));
    }

    #[test]
    fn reuse_limit_zero_means_disabled() {
        let mut settings: Settings = serde_json::from_str(&sample_json()).unwrap();
        settings.target.reuse_limit = Some(0);
        assert_eq!(settings.reuse_limit(), None);
        settings.target.reuse_limit = None;
        assert_eq!(settings.reuse_limit(), None);
    }

    #[test]
    fn security_serialization() {
        let tls: Security = serde_json::from_str("\"tls\"").unwrap();
        assert_eq!(tls, Security::Tls);
        let starttls: Security = serde_json::from_str("\"starttls\"").unwrap();
        assert_eq!(starttls, Security::StartTls);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, sample_json()).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.source.host, "imap.example.com");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Settings::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reports_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
