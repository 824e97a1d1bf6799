//! Raw header parsing and allow-listed passthrough.
//!
//! The filter works on the raw header block of the source message:
//! continuation lines are folded onto their logical predecessor, then
//! only a fixed set of headers survives onto the outbound message, each
//! MIME-decoded through the injected decoder. Everything else
//! (`Received`, `DKIM-Signature`, routing noise) is dropped.

/// Headers passed through from the source message to the outbound one.
pub const FORWARDED_HEADERS: [&str; 12] = [
    "List-Id",
    "List-Help",
    "X-Course-Id",
    "X-Course-Name",
    "Precedence",
    "X-Auto-Response-Suppress",
    "Auto-Submitted",
    "List-Unsubscribe",
    "Thread-Topic",
    "Thread-Index",
    "In-Reply-To",
    "Reply-To",
];

/// Parses a raw header block into an ordered name/value mapping.
///
/// Continuation lines (beginning with space or tab) are appended to the
/// value of the preceding header, joined with a newline and their
/// leading whitespace preserved. A repeated header name overwrites the
/// earlier value in place. Lines without a `:` separator are ignored.
pub fn parse_raw_headers(raw: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut current: Option<String> = None;

    for line in raw.trim().split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(name) = &current {
                if let Some((_, value)) = headers.iter_mut().find(|(n, _)| n == name) {
                    value.push('\n');
                    value.push_str(line);
                }
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.to_string();
        let value = value.trim().to_string();
        match headers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => headers.push((name.clone(), value)),
        }
        current = Some(name);
    }

    headers
}

/// Filters a raw header block down to the passthrough set.
///
/// Each surviving value is run through `decode` (MIME-decoding is the
/// mail provider's concern) before being attached to the outbound
/// message. Order follows the source message.
pub fn filter_headers(raw: &str, decode: impl Fn(&str) -> String) -> Vec<(String, String)> {
    parse_raw_headers(raw)
        .into_iter()
        .filter(|(name, _)| FORWARDED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| (name, decode(&value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(value: &str) -> String {
        value.to_string()
    }

    #[test]
    fn parses_simple_headers_in_order() {
        let raw = "From: a@example.com\r\nTo: b@example.com\r\nSubject: hi\r\n";
        let headers = parse_raw_headers(raw);
        assert_eq!(
            headers,
            vec![
                ("From".to_string(), "a@example.com".to_string()),
                ("To".to_string(), "b@example.com".to_string()),
                ("Subject".to_string(), "hi".to_string()),
            ]
        );
    }

    #[test]
    fn folds_continuation_lines_onto_predecessor() {
        let raw = "List-Id: The List\r\n <list.example.com>\r\nSubject: hi\r\n";
        let headers = parse_raw_headers(raw);
        assert_eq!(headers[0].0, "List-Id");
        assert_eq!(headers[0].1, "The List\n <list.example.com>");
    }

    #[test]
    fn repeated_header_overwrites_in_place() {
        let raw = "X-Course-Id: 1\r\nSubject: hi\r\nX-Course-Id: 2\r\n";
        let headers = parse_raw_headers(raw);
        assert_eq!(
            headers,
            vec![
                ("X-Course-Id".to_string(), "2".to_string()),
                ("Subject".to_string(), "hi".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let raw = "From: a@example.com\nnot a header line\nSubject: hi\n";
        let headers = parse_raw_headers(raw);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn filter_keeps_only_the_passthrough_set() {
        let raw = "Received: by relay\r\n\
                   List-Id: <list.example.com>\r\n\
                   DKIM-Signature: v=1\r\n\
                   Precedence: bulk\r\n\
                   Subject: hi\r\n";
        let filtered = filter_headers(raw, identity);
        assert_eq!(
            filtered,
            vec![
                ("List-Id".to_string(), "<list.example.com>".to_string()),
                ("Precedence".to_string(), "bulk".to_string()),
            ]
        );
    }

    #[test]
    fn filter_decodes_surviving_values() {
        let raw = "Reply-To: =?utf-8?q?caf=C3=A9?= <x@example.com>\r\nReceived: by relay\r\n";
        let filtered = filter_headers(raw, crate::providers::decode_header_value);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].0, "Reply-To");
        assert!(filtered[0].1.contains("café"));
    }

    #[test]
    fn filter_of_empty_block_is_empty() {
        assert!(filter_headers("", identity).is_empty());
    }

    #[test]
    fn header_names_match_exactly() {
        // The allow-list comparison is exact, as in the original filter.
        let filtered = filter_headers("list-id: <a>\r\nList-Id: <b>\r\n", identity);
        assert_eq!(filtered, vec![("List-Id".to_string(), "<b>".to_string())]);
    }
}
