//! Alias tag extraction from recipient addresses.

use regex::Regex;

/// Extracts the alias tag from `localpart+tag@domain` style addresses.
///
/// The pattern is compiled once at construction; extraction itself is
/// pure and deterministic.
#[derive(Debug, Clone)]
pub struct AliasExtractor {
    pattern: Regex,
}

impl AliasExtractor {
    /// Creates an extractor for the `localpart+tag@domain` shape: a `+`
    /// not at position 0, preceded by a plus-free local part, with the
    /// tag running up to the `@`.
    pub fn new() -> Self {
        Self {
            // Infallible: the pattern is a literal part of the program.
            pattern: Regex::new(r"^[^+]+\+([^@]+)@").unwrap(),
        }
    }

    /// Returns the embedded alias tag, or `None` when the address does
    /// not carry one.
    pub fn extract(&self, address: &str) -> Option<String> {
        self.pattern
            .captures(address)
            .map(|captures| captures[1].to_string())
    }
}

impl Default for AliasExtractor {
    fn default() -> Self {
        Self::new()
    }
}
