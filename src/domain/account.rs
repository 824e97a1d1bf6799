//! Outbound account identity.
//!
//! Accounts are a fixed ordered sequence configured at startup and never
//! mutated at runtime; the rotator selects among them by index.

use serde::{Deserialize, Serialize};

/// One outbound SMTP identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// SMTP login username.
    pub username: String,
    /// SMTP login password.
    pub password: String,
    /// Sender address used when this account is active.
    pub sender_address: String,
    /// Position in the rotation sequence.
    pub index: usize,
}

impl Account {
    /// Creates an account at the given rotation position.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        sender_address: impl Into<String>,
        index: usize,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            sender_address: sender_address.into(),
            index,
        }
    }
}
