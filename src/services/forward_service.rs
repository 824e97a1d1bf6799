//! The forwarding pipeline.
//!
//! [`ForwardService`] drives one pass over the source mailbox: alias
//! extraction over each message's recipients, outbound construction via
//! the header filter, allow-list enforcement, account selection through
//! the rotator, SMTP submission, and deletion of the source message
//! strictly after the send is confirmed. A submission failure aborts
//! the whole run; a re-run picks up every undeleted message, so the
//! relay is at-least-once by construction.

use crate::config::{ConfigError, Settings};
use crate::domain::{Address, ForwardTarget, InboundMessage, MessageUid, OutboundMessage};
use crate::providers::{decode_header_value, Mailbox, Outbox, ProviderError};
use crate::relay::{
    filter_headers, AccountRotator, AliasExtractor, AllowList, REJECTED_SUBJECT_PREFIX,
};

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Configuration failed validation; nothing was connected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source mailbox failed (connect, enumerate, fetch or delete).
    #[error("mailbox error: {0}")]
    Mailbox(#[source] ProviderError),

    /// A message submission failed; the current and all remaining
    /// messages are left undeleted in the source mailbox.
    #[error("submission failed: {0}")]
    Submission(#[source] ProviderError),
}

/// Counters for one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Messages forwarded to their alias targets.
    pub forwarded: usize,
    /// Messages without any alias-tagged recipient, left in place.
    pub skipped: usize,
    /// Messages from blocked senders, redirected to the abuse address.
    pub rejected: usize,
}

/// Orchestrates one forwarding run over the two protocol collaborators.
#[derive(Debug)]
pub struct ForwardService<M, O> {
    mailbox: M,
    outbox: O,
    rotator: AccountRotator,
    alias: AliasExtractor,
    allow_list: AllowList,
    target_domain: String,
    abuse_address: Option<String>,
    session_open: bool,
}

impl<M: Mailbox, O: Outbox> ForwardService<M, O> {
    /// Builds the pipeline from validated settings.
    ///
    /// Configuration problems (mismatched account lists, uncompilable
    /// allow-list patterns) surface here, before anything connects.
    pub fn new(mailbox: M, outbox: O, settings: &Settings) -> Result<Self, ForwardError> {
        settings.validate()?;
        let allow_list = AllowList::from_entries(&settings.allowed_senders)?;
        let rotator = AccountRotator::new(
            settings.accounts(),
            settings.reuse_limit(),
            settings.cycle_pause(),
        );

        Ok(Self {
            mailbox,
            outbox,
            rotator,
            alias: AliasExtractor::new(),
            allow_list,
            target_domain: settings.target.domain.clone(),
            abuse_address: settings.abuse_address.clone(),
            session_open: false,
        })
    }

    /// Processes every message currently in the source mailbox.
    pub async fn run(mut self) -> Result<RunReport, ForwardError> {
        self.mailbox.connect().await.map_err(ForwardError::Mailbox)?;
        let uids = self
            .mailbox
            .search_all()
            .await
            .map_err(ForwardError::Mailbox)?;
        tracing::info!(messages = uids.len(), "source mailbox enumerated");

        let mut report = RunReport::default();
        let outcome = self.forward_all(uids, &mut report).await;

        // Tear down both sessions even when aborting: disconnecting the
        // mailbox expunges the deletions already confirmed by a send.
        let close = self.outbox.close().await;
        let disconnect = self.mailbox.disconnect().await;

        outcome?;
        close.map_err(ForwardError::Submission)?;
        disconnect.map_err(ForwardError::Mailbox)?;

        Ok(report)
    }

    async fn forward_all(
        &mut self,
        uids: Vec<MessageUid>,
        report: &mut RunReport,
    ) -> Result<(), ForwardError> {
        for uid in uids {
            let mail = self.mailbox.fetch(uid).await.map_err(ForwardError::Mailbox)?;

            let targets = self.collect_targets(&mail);
            if targets.is_empty() {
                tracing::info!(%uid, "no alias-tagged recipient, leaving in mailbox");
                report.skipped += 1;
                continue;
            }

            if !self.session_open {
                self.outbox
                    .connect(self.rotator.current())
                    .await
                    .map_err(ForwardError::Submission)?;
                self.session_open = true;
            }

            let (outbound, blocked) = self.build_outbound(&mail, &targets);
            self.outbox
                .submit(&outbound)
                .await
                .map_err(ForwardError::Submission)?;

            // The send is confirmed; only now may the source go away.
            self.mailbox.delete(uid).await.map_err(ForwardError::Mailbox)?;

            if blocked {
                report.rejected += 1;
            } else {
                report.forwarded += 1;
            }

            let rotation = self.rotator.release();
            if rotation.rotated {
                self.outbox.close().await.map_err(ForwardError::Submission)?;
                self.session_open = false;
                if let Some(pause) = rotation.pause {
                    tracing::info!(seconds = pause.as_secs(), "rotation cycle complete, pausing");
                    tokio::time::sleep(pause).await;
                }
            }
        }
        Ok(())
    }

    /// Derives forward targets from every alias-tagged recipient.
    fn collect_targets(&self, mail: &InboundMessage) -> Vec<ForwardTarget> {
        mail.to
            .iter()
            .filter_map(|recipient| {
                self.alias.extract(&recipient.email).map(|tag| {
                    ForwardTarget::new(tag, &self.target_domain, recipient.name.clone())
                })
            })
            .collect()
    }

    /// Builds the outbound message for one inbound message and its
    /// targets; returns it along with whether the sender was blocked.
    fn build_outbound(
        &self,
        mail: &InboundMessage,
        targets: &[ForwardTarget],
    ) -> (OutboundMessage, bool) {
        let tags: Vec<&str> = targets.iter().map(|t| t.tag.as_str()).collect();

        let mut headers = vec![
            ("X-Forwarded-From".to_string(), mail.from.email.clone()),
            ("X-Forwarded-For".to_string(), tags.join(", ")),
        ];
        let passthrough = filter_headers(&mail.raw_headers, decode_header_value);
        let has_reply_to = passthrough.iter().any(|(name, _)| name == "Reply-To");
        headers.extend(passthrough);

        let sender = self.rotator.current();
        let mut outbound = OutboundMessage {
            from: Some(Address {
                email: sender.sender_address.clone(),
                name: mail.from.name.clone(),
            }),
            to: targets.iter().map(|t| t.address.clone()).collect(),
            subject: mail.subject.clone().unwrap_or_default(),
            message_id: mail.message_id.clone(),
            date: mail.date,
            reply_to: (!has_reply_to).then(|| mail.from.clone()),
            headers,
            body_text: mail.body_text.clone(),
            body_html: mail.body_html.clone(),
        };

        let blocked = !self.allow_list.permits(&mail.from.email);
        if blocked {
            if let Some(abuse) = &self.abuse_address {
                tracing::warn!(
                    sender = %mail.from.email,
                    "sender not on allow-list, redirecting to abuse address"
                );
                outbound.to = vec![Address::new(abuse.clone())];
                outbound.subject = format!("{}{}", REJECTED_SUBJECT_PREFIX, outbound.subject);
            }
        }

        (outbound, blocked)
    }
}
