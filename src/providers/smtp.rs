//! Outbound SMTP implementation.
//!
//! Implements [`Outbox`] over `lettre`'s async SMTP transport. The
//! outbound message is composed into RFC 5322 bytes with `mail-builder`
//! (custom headers need arbitrary names, which the typed lettre builder
//! does not offer) and transmitted with an explicit envelope via
//! `send_raw`. One transport is held per acquired account; dropping it
//! on close ends the pooled connections.

use async_trait::async_trait;
use lettre::address::{Address as EnvelopeAddress, Envelope};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use mail_builder::headers::address::Address as HeaderAddress;
use mail_builder::headers::raw::Raw;
use mail_builder::headers::text::Text;
use mail_builder::MessageBuilder;

use super::{Outbox, ProviderError, Result};
use crate::config::{Security, TargetSettings};
use crate::domain::{Account, Address, OutboundMessage};

/// SMTP implementation of the outbound [`Outbox`].
pub struct SmtpOutbox {
    host: String,
    port: u16,
    security: Security,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpOutbox {
    /// Creates an outbox for the configured target server.
    pub fn new(settings: &TargetSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            security: settings.security,
            transport: None,
        }
    }

    fn header_address(addr: &Address) -> HeaderAddress<'_> {
        HeaderAddress::new_address(addr.name.as_deref(), addr.email.as_str())
    }

    /// Composes the RFC 5322 byte representation of one outbound message.
    fn compose(message: &OutboundMessage) -> Result<Vec<u8>> {
        let mut builder = MessageBuilder::new();

        if let Some(from) = &message.from {
            builder = builder.from(Self::header_address(from));
        }
        builder = builder.to(HeaderAddress::new_list(
            message.to.iter().map(Self::header_address).collect(),
        ));
        builder = builder.subject(message.subject.as_str());

        if let Some(id) = &message.message_id {
            let id = id.trim_matches(|c| c == '<' || c == '>');
            builder = builder.header("Message-ID", Raw::new(format!("<{}>", id)));
        }
        if let Some(date) = &message.date {
            builder = builder.header("Date", Raw::new(date.to_rfc2822()));
        }
        if let Some(reply_to) = &message.reply_to {
            builder = builder.reply_to(Self::header_address(reply_to));
        }
        for (name, value) in &message.headers {
            builder = builder.header(name.clone(), Text::new(value.clone()));
        }

        match (&message.body_html, &message.body_text) {
            (Some(html), Some(text)) => {
                builder = builder.html_body(html.as_str()).text_body(text.as_str());
            }
            (Some(html), None) => {
                builder = builder.html_body(html.as_str());
            }
            (None, Some(text)) => {
                builder = builder.text_body(text.as_str());
            }
            (None, None) => {
                builder = builder.text_body("");
            }
        }

        builder
            .write_to_vec()
            .map_err(|e| ProviderError::InvalidRequest(format!("failed to build message: {}", e)))
    }

    /// Builds the SMTP envelope for one outbound message.
    fn envelope(message: &OutboundMessage) -> Result<Envelope> {
        let from = message
            .from
            .as_ref()
            .map(|addr| addr.email.parse::<EnvelopeAddress>())
            .transpose()
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid sender address: {}", e)))?;

        let to = message
            .to
            .iter()
            .map(|addr| addr.email.parse::<EnvelopeAddress>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                ProviderError::InvalidRequest(format!("invalid recipient address: {}", e))
            })?;

        Envelope::new(from, to)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid envelope: {}", e)))
    }
}

#[async_trait]
impl Outbox for SmtpOutbox {
    async fn connect(&mut self, account: &Account) -> Result<()> {
        let credentials =
            SmtpCredentials::new(account.username.clone(), account.password.clone());

        let transport = match self.security {
            Security::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
                .map_err(|e| ProviderError::Connection(format!("SMTP relay error: {}", e)))?
                .credentials(credentials)
                .port(self.port)
                .build(),
            Security::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| ProviderError::Connection(format!("SMTP relay error: {}", e)))?
                .credentials(credentials)
                .port(self.port)
                .build(),
        };

        self.transport = Some(transport);
        tracing::info!(
            account = account.index,
            sender = %account.sender_address,
            "outbound session opened"
        );
        Ok(())
    }

    async fn submit(&mut self, message: &OutboundMessage) -> Result<()> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| ProviderError::Connection("no outbound session".to_string()))?;

        let envelope = Self::envelope(message)?;
        let bytes = Self::compose(message)?;

        transport
            .send_raw(&envelope, &bytes)
            .await
            .map_err(|e| ProviderError::Send(e.to_string()))?;

        tracing::info!(recipients = message.to.len(), "message submitted");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the transport closes its pooled connections.
        self.transport = None;
        Ok(())
    }
}
