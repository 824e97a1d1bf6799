//! tagrelay - an alias-tag mail forwarder
//!
//! Relays mail arriving at a single catch-all mailbox to per-alias
//! targets (`user+alias@domain` style), rewriting a controlled set of
//! headers, enforcing a sender allow-list, and rotating across several
//! outbound SMTP accounts to spread load.

pub mod config;
pub mod domain;
pub mod providers;
pub mod relay;
pub mod services;
