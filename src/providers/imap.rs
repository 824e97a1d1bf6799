//! IMAP source mailbox implementation.
//!
//! Implements [`Mailbox`] over IMAP4rev1 (RFC 3501) via `async-imap`,
//! connecting with implicit TLS through `rustls`. Messages are fetched
//! whole (`BODY[]`) and parsed with `mail-parser`; the unparsed header
//! block is preserved alongside so the header filter can work on the
//! original folded lines. Deletions are flagged during the run and
//! expunged on disconnect.

use async_trait::async_trait;
use chrono::DateTime;
use futures::StreamExt;
use mail_parser::{Addr, Message as ParsedMessage, MessageParser};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use super::{Mailbox, ProviderError, Result};
use crate::config::SourceSettings;
use crate::domain::{Address, InboundMessage, MessageUid};

/// Type alias for the IMAP session with TLS (using tokio-util compat layer).
type ImapSession = async_imap::Session<Compat<TlsStream<TcpStream>>>;

/// IMAP implementation of the source [`Mailbox`].
pub struct ImapMailbox {
    settings: SourceSettings,
    session: Option<ImapSession>,
}

impl ImapMailbox {
    /// Creates a mailbox for the configured source server.
    ///
    /// Nothing is connected until [`Mailbox::connect`] is called.
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    /// Establishes the TLS connection with the futures compat wrapper.
    async fn connect_tls(&self) -> Result<Compat<TlsStream<TcpStream>>> {
        let tcp_stream =
            TcpStream::connect(format!("{}:{}", self.settings.host, self.settings.port))
                .await
                .map_err(|e| ProviderError::Connection(format!("TCP connect failed: {}", e)))?;

        let config = ClientConfig::builder()
            .with_root_certificates(tokio_rustls::rustls::RootCertStore::from_iter(
                webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
            ))
            .with_no_client_auth();

        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(self.settings.host.clone())
            .map_err(|e| ProviderError::Connection(format!("invalid server name: {}", e)))?;

        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| ProviderError::Connection(format!("TLS handshake failed: {}", e)))?;

        // Wrap with tokio-util compat layer for futures async read/write traits
        Ok(tls_stream.compat())
    }

    fn session_mut(&mut self) -> Result<&mut ImapSession> {
        self.session
            .as_mut()
            .ok_or_else(|| ProviderError::Connection("not connected".to_string()))
    }

    /// Consumes a stream to completion.
    async fn drain_stream<T, E>(
        stream: impl futures::Stream<Item = std::result::Result<T, E>>,
    ) -> std::result::Result<(), E> {
        futures::pin_mut!(stream);
        while let Some(result) = stream.next().await {
            result?;
        }
        Ok(())
    }

    /// Parses a mail_parser Addr to our Address type.
    fn parse_address(addr: &Addr) -> Address {
        Address {
            email: addr.address().unwrap_or("").to_string(),
            name: addr.name().map(|s| s.to_string()),
        }
    }

    /// Extracts the ordered recipient list.
    fn extract_to(message: &ParsedMessage) -> Vec<Address> {
        message
            .to()
            .and_then(|addr| addr.as_list())
            .map(|list| list.iter().map(Self::parse_address).collect())
            .unwrap_or_default()
    }

    /// Splits the unparsed header block off the raw message bytes,
    /// folded lines intact.
    fn raw_header_block(raw: &[u8]) -> String {
        let end = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .or_else(|| raw.windows(2).position(|w| w == b"\n\n"))
            .unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).to_string()
    }

    /// Builds an [`InboundMessage`] from the fetched message bytes.
    fn to_inbound(uid: MessageUid, raw: &[u8]) -> Option<InboundMessage> {
        let message = MessageParser::default().parse(raw)?;

        let from = message
            .from()
            .and_then(|addr| addr.as_list())
            .and_then(|list| list.first())
            .map(Self::parse_address)
            .unwrap_or_else(|| Address::new("unknown@unknown.com"));

        let to = Self::extract_to(&message);
        let subject = message.subject().map(|s| s.to_string());
        let message_id = message.message_id().map(|s| s.to_string());

        let date = message
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

        let body_text = message.body_text(0).map(|s| s.to_string());
        let body_html = if message.html_body.is_empty() {
            None
        } else {
            message.body_html(0).map(|s| s.to_string())
        };

        Some(InboundMessage {
            uid,
            from,
            to,
            subject,
            message_id,
            date,
            raw_headers: Self::raw_header_block(raw),
            body_text,
            body_html,
        })
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn connect(&mut self) -> Result<()> {
        let tls_stream = self.connect_tls().await?;
        let client = async_imap::Client::new(tls_stream);

        let mut session = client
            .login(&self.settings.user, &self.settings.password)
            .await
            .map_err(|e| ProviderError::Authentication(format!("IMAP login failed: {:?}", e.0)))?;

        session
            .select(&self.settings.folder)
            .await
            .map_err(|e| ProviderError::Connection(format!("SELECT failed: {}", e)))?;

        self.session = Some(session);
        tracing::info!(
            host = %self.settings.host,
            folder = %self.settings.folder,
            "source mailbox connected"
        );
        Ok(())
    }

    async fn search_all(&mut self) -> Result<Vec<MessageUid>> {
        let session = self.session_mut()?;

        let uids = session
            .uid_search("ALL")
            .await
            .map_err(|e| ProviderError::Connection(format!("SEARCH failed: {}", e)))?;

        // Process in stored order, oldest first.
        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        Ok(uid_list.into_iter().map(MessageUid).collect())
    }

    async fn fetch(&mut self, uid: MessageUid) -> Result<InboundMessage> {
        let session = self.session_mut()?;

        let fetches = session
            .uid_fetch(uid.0.to_string(), "(UID BODY[])")
            .await
            .map_err(|e| ProviderError::Connection(format!("FETCH failed: {}", e)))?;
        futures::pin_mut!(fetches);

        let mut raw: Option<Vec<u8>> = None;
        while let Some(fetch_result) = fetches.next().await {
            let fetch =
                fetch_result.map_err(|e| ProviderError::Connection(format!("FETCH stream: {}", e)))?;
            if fetch.uid == Some(uid.0) {
                if let Some(body) = fetch.body() {
                    raw = Some(body.to_vec());
                }
            }
        }

        let raw = raw.ok_or_else(|| ProviderError::NotFound(format!("message {}", uid)))?;
        Self::to_inbound(uid, &raw)
            .ok_or_else(|| ProviderError::InvalidRequest(format!("unparseable message {}", uid)))
    }

    async fn delete(&mut self, uid: MessageUid) -> Result<()> {
        let session = self.session_mut()?;

        let store_stream = session
            .uid_store(uid.0.to_string(), "+FLAGS (\\Deleted)")
            .await
            .map_err(|e| ProviderError::Connection(format!("STORE failed: {}", e)))?;
        Self::drain_stream(store_stream)
            .await
            .map_err(|e| ProviderError::Connection(format!("STORE stream: {}", e)))?;

        tracing::debug!(%uid, "source message flagged for deletion");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            let expunge_stream = session
                .expunge()
                .await
                .map_err(|e| ProviderError::Connection(format!("EXPUNGE failed: {}", e)))?;
            Self::drain_stream(expunge_stream)
                .await
                .map_err(|e| ProviderError::Connection(format!("EXPUNGE stream: {}", e)))?;

            session
                .logout()
                .await
                .map_err(|e| ProviderError::Connection(format!("LOGOUT failed: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SourceSettings {
        SourceSettings {
            host: "imap.example.com".to_string(),
            port: 993,
            user: "catchall@example.com".to_string(),
            password: "secret".to_string(),
            folder: "INBOX".to_string(),
            security: crate::config::Security::Tls,
        }
    }

    const SAMPLE: &[u8] = b"From: Alice Sender <alice@example.com>\r\n\
To: Catch All <catch+news@example.com>, bob@example.com\r\n\
Subject: Weekly update\r\n\
Message-ID: <abc123@example.com>\r\n\
Date: Tue, 1 Jul 2025 10:00:00 +0000\r\n\
List-Id: Updates\r\n <updates.example.com>\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hello there\r\n";

    #[test]
    fn mailbox_starts_disconnected() {
        let mut mailbox = ImapMailbox::new(settings());
        assert!(matches!(
            mailbox.session_mut().unwrap_err(),
            ProviderError::Connection(_)
        ));
    }

    #[test]
    fn parses_message_fields() {
        let inbound = ImapMailbox::to_inbound(MessageUid(5), SAMPLE).unwrap();
        assert_eq!(inbound.uid, MessageUid(5));
        assert_eq!(inbound.from.email, "alice@example.com");
        assert_eq!(inbound.from.name.as_deref(), Some("Alice Sender"));
        assert_eq!(inbound.subject.as_deref(), Some("Weekly update"));
        assert_eq!(inbound.message_id.as_deref(), Some("abc123@example.com"));
        assert!(inbound.date.is_some());
        assert!(inbound.body_text.unwrap().starts_with("Hello there"));
        assert!(inbound.body_html.is_none());
    }

    #[test]
    fn recipients_keep_header_order() {
        let inbound = ImapMailbox::to_inbound(MessageUid(1), SAMPLE).unwrap();
        assert_eq!(inbound.to.len(), 2);
        assert_eq!(inbound.to[0].email, "catch+news@example.com");
        assert_eq!(inbound.to[0].name.as_deref(), Some("Catch All"));
        assert_eq!(inbound.to[1].email, "bob@example.com");
    }

    #[test]
    fn raw_header_block_preserves_folding() {
        let inbound = ImapMailbox::to_inbound(MessageUid(1), SAMPLE).unwrap();
        assert!(inbound
            .raw_headers
            .contains("List-Id: Updates\r\n <updates.example.com>"));
        assert!(!inbound.raw_headers.contains("Hello there"));
    }

    #[test]
    fn header_block_without_separator_is_whole_input() {
        let raw = b"From: a@example.com\r\nSubject: x";
        assert_eq!(
            ImapMailbox::raw_header_block(raw),
            "From: a@example.com\r\nSubject: x"
        );
    }
}
