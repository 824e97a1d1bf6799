//! Message types flowing through the relay.
//!
//! [`InboundMessage`] is the parsed view of one message fetched from the
//! source mailbox; it is immutable once fetched and owned by the pipeline
//! for the duration of that message's processing. [`OutboundMessage`] is
//! the fully decided message handed to the SMTP collaborator for one send.

use chrono::{DateTime, Utc};

use super::{Address, MessageUid};

/// A message fetched from the source mailbox.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Mailbox-scoped identifier used for deletion.
    pub uid: MessageUid,
    /// Sender address and display name.
    pub from: Address,
    /// Recipient addresses in header order.
    pub to: Vec<Address>,
    /// Subject line, if present.
    pub subject: Option<String>,
    /// RFC 5322 Message-ID (without angle brackets), if present.
    pub message_id: Option<String>,
    /// Date the message was sent.
    pub date: Option<DateTime<Utc>>,
    /// Raw header block as stored, folded continuation lines preserved.
    pub raw_headers: String,
    /// Plain text body content.
    pub body_text: Option<String>,
    /// HTML body content.
    pub body_html: Option<String>,
}

/// A forwarding destination derived from one alias-tagged recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTarget {
    /// The alias tag embedded in the recipient address.
    pub tag: String,
    /// Reconstructed destination: `<tag>@<target domain>` plus the
    /// original recipient's display name.
    pub address: Address,
}

impl ForwardTarget {
    /// Builds a target for `tag` under the configured target domain,
    /// carrying over the matched recipient's display name.
    pub fn new(tag: impl Into<String>, domain: &str, name: Option<String>) -> Self {
        let tag = tag.into();
        let address = Address {
            email: format!("{}@{}", tag, domain),
            name,
        };
        Self { tag, address }
    }
}

/// A fully decided outbound message, ready for submission.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    /// Sender identity: the acquired account's sender address combined
    /// with the original sender's display name.
    pub from: Option<Address>,
    /// Recipients; either the derived forward targets or, for a blocked
    /// sender, the single abuse address.
    pub to: Vec<Address>,
    /// Subject, prefixed with the rejection marker when blocked.
    pub subject: String,
    /// Message-ID carried over from the source (without angle brackets).
    pub message_id: Option<String>,
    /// Date carried over from the source.
    pub date: Option<DateTime<Utc>>,
    /// Reply-To synthesized from the original sender when the source
    /// message carried none of its own.
    pub reply_to: Option<Address>,
    /// Custom headers in insertion order: the two synthesized
    /// X-Forwarded-* headers followed by the allow-listed passthroughs.
    pub headers: Vec<(String, String)>,
    /// Plain text body.
    pub body_text: Option<String>,
    /// HTML body; when present the plain text becomes the alternative part.
    pub body_html: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_target_reconstructs_address() {
        let target = ForwardTarget::new("news", "out.example.com", None);
        assert_eq!(target.tag, "news");
        assert_eq!(target.address.email, "news@out.example.com");
        assert!(target.address.name.is_none());
    }

    #[test]
    fn forward_target_keeps_display_name() {
        let target = ForwardTarget::new("ops", "out.example.com", Some("Ops Team".to_string()));
        assert_eq!(target.address.display(), "Ops Team <ops@out.example.com>");
    }

    #[test]
    fn outbound_message_default_is_empty() {
        let msg = OutboundMessage::default();
        assert!(msg.from.is_none());
        assert!(msg.to.is_empty());
        assert!(msg.headers.is_empty());
    }
}
