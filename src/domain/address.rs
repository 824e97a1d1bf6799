//! Address and identifier types.
//!
//! Newtype wrappers and small value types shared across the relay,
//! preventing accidental mixing of mailbox identifiers with other integers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Email address.
    pub email: String,
    /// Display name (e.g., "John Doe").
    pub name: Option<String>,
}

impl Address {
    /// Creates a new address with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates a new address with email and display name.
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Returns the display representation of this address.
    ///
    /// If a name is present, returns "Name <email>", otherwise just the email.
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Mailbox-scoped identifier of a stored message (IMAP UID).
///
/// Only meaningful for the duration of one run against one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageUid(pub u32);

impl fmt::Display for MessageUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MessageUid {
    fn from(uid: u32) -> Self {
        Self(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_with_name() {
        let addr = Address::with_name("test@example.com", "Test User");
        assert_eq!(addr.display(), "Test User <test@example.com>");
    }

    #[test]
    fn address_display_without_name() {
        let addr = Address::new("test@example.com");
        assert_eq!(addr.display(), "test@example.com");
    }

    #[test]
    fn address_equality() {
        let addr1 = Address::new("test@example.com");
        let addr2 = Address::new("test@example.com");
        assert_eq!(addr1, addr2);
    }

    #[test]
    fn message_uid_ordering_in_set() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(MessageUid(7));
        assert!(set.contains(&MessageUid::from(7)));
    }

    #[test]
    fn message_uid_display() {
        assert_eq!(MessageUid(42).to_string(), "42");
    }
}
