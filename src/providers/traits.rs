//! Collaborator trait definitions.
//!
//! The pipeline only ever talks to the source mailbox and the outbound
//! SMTP server through these traits, which keeps the forwarding logic
//! testable against in-memory fakes.

use async_trait::async_trait;

use crate::domain::{Account, InboundMessage, MessageUid, OutboundMessage};

/// Result type alias for collaborator operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors raised by the mailbox and SMTP collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or protocol-level connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// A request could not be built from the given data.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested message was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server rejected a message submission.
    #[error("send failed: {0}")]
    Send(String),
}

/// Source mailbox collaborator.
///
/// Deletions are only marked during the run; the backing store must
/// expunge them on [`disconnect`](Mailbox::disconnect) so that a crash
/// mid-run leaves unconfirmed messages in place.
#[async_trait]
pub trait Mailbox: Send {
    /// Connects, authenticates, and opens the configured folder.
    async fn connect(&mut self) -> Result<()>;

    /// Enumerates every message in the folder, in ascending UID order.
    async fn search_all(&mut self) -> Result<Vec<MessageUid>>;

    /// Fetches one message: parsed fields plus the raw header block.
    async fn fetch(&mut self, uid: MessageUid) -> Result<InboundMessage>;

    /// Marks one message deleted.
    async fn delete(&mut self, uid: MessageUid) -> Result<()>;

    /// Expunges marked deletions and closes the session.
    async fn disconnect(&mut self) -> Result<()>;
}

/// Outbound SMTP collaborator.
#[async_trait]
pub trait Outbox: Send {
    /// Opens an authenticated session for the given account.
    async fn connect(&mut self, account: &Account) -> Result<()>;

    /// Transmits one fully composed message.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Send`] with the server's diagnostic when
    /// the submission is not accepted; the pipeline treats this as fatal
    /// for the remainder of the run.
    async fn submit(&mut self, message: &OutboundMessage) -> Result<()>;

    /// Closes the live session, if any.
    async fn close(&mut self) -> Result<()>;
}
