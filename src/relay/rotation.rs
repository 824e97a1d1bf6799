//! Round-robin rotation over the outbound accounts.
//!
//! The rotator owns the `(index, uses)` pair described by the pipeline
//! design; [`AccountRotator::release`] is its only mutator and tells the
//! caller what to do with the live SMTP session. The accounts themselves
//! are fixed for the lifetime of a run.

use std::num::NonZeroU32;
use std::time::Duration;

use crate::domain::Account;

/// Outcome of releasing the active account after one sent message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rotation {
    /// The active account changed; the live session must be closed.
    pub rotated: bool,
    /// A full cycle completed; sleep this long before the next acquire.
    pub pause: Option<Duration>,
}

/// Stateful selector over the configured outbound accounts.
#[derive(Debug)]
pub struct AccountRotator {
    accounts: Vec<Account>,
    reuse_limit: Option<NonZeroU32>,
    cycle_pause: Duration,
    index: usize,
    uses: u32,
}

impl AccountRotator {
    /// Creates a rotator starting at account 0 with zero uses.
    ///
    /// `accounts` must be non-empty; configuration validation guarantees
    /// this before a rotator is built. A `reuse_limit` of `None` rotates
    /// after every sent message.
    pub fn new(
        accounts: Vec<Account>,
        reuse_limit: Option<NonZeroU32>,
        cycle_pause: Duration,
    ) -> Self {
        debug_assert!(!accounts.is_empty());
        Self {
            accounts,
            reuse_limit,
            cycle_pause,
            index: 0,
            uses: 0,
        }
    }

    /// The account to use for the next send.
    pub fn current(&self) -> &Account {
        &self.accounts[self.index]
    }

    /// Number of configured accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Records one completed send on the active account.
    ///
    /// Advances to the next account once the reuse limit is reached
    /// (or on every send when no limit is configured). When the advance
    /// wraps back to account 0 and a pause is configured, the returned
    /// [`Rotation`] carries the duration to sleep before the next
    /// acquire.
    pub fn release(&mut self) -> Rotation {
        self.uses += 1;
        let rotate = match self.reuse_limit {
            None => true,
            Some(limit) => self.uses == limit.get(),
        };
        if !rotate {
            return Rotation::default();
        }

        self.uses = 0;
        self.index = (self.index + 1) % self.accounts.len();
        let wrapped = self.index == 0;
        Rotation {
            rotated: true,
            pause: (wrapped && !self.cycle_pause.is_zero()).then_some(self.cycle_pause),
        }
    }
}
