//! Protocol collaborators consumed by the pipeline.

mod imap;
mod mime;
mod smtp;
mod traits;

pub use imap::ImapMailbox;
pub use mime::decode_header_value;
pub use smtp::SmtpOutbox;
pub use traits::{Mailbox, Outbox, ProviderError, Result};
