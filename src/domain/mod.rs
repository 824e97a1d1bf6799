//! Domain layer types for the relay.
//!
//! This module contains the core types used throughout the forwarding
//! pipeline: addresses, accounts, and the inbound/outbound message shapes.

mod account;
mod address;
mod message;

pub use account::Account;
pub use address::{Address, MessageUid};
pub use message::{ForwardTarget, InboundMessage, OutboundMessage};
