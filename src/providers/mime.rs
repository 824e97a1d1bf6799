//! MIME-encoded header value decoding.

/// Decodes a raw header value: RFC 2047 encoded words are decoded and
/// folded continuation lines are unfolded.
///
/// The value is run through a real header parser by prepending a
/// synthetic header name; on parse failure the raw value is returned
/// unchanged rather than dropped.
pub fn decode_header_value(raw: &str) -> String {
    let synthetic = format!("X-Decode: {}\n", raw);
    match mailparse::parse_header(synthetic.as_bytes()) {
        Ok((header, _)) => header.get_value(),
        Err(_) => raw.to_string(),
    }
}
