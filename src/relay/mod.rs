//! Forwarding decision components.
//!
//! The pure pieces of the pipeline: alias extraction, header
//! filtering, sender allow-listing, and the account rotation state
//! machine. Each is independently testable; the
//! [`ForwardService`](crate::services::ForwardService) wires them
//! together.

mod alias;
mod allowlist;
mod headers;
mod rotation;

pub use alias::AliasExtractor;
pub use allowlist::{AllowList, AllowListEntry, REJECTED_SUBJECT_PREFIX};
pub use headers::{filter_headers, parse_raw_headers, FORWARDED_HEADERS};
pub use rotation::{AccountRotator, Rotation};
