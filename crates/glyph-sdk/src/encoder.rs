//! Display-oriented text encoding of stored content.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Render `data` as a `data:` URI.
///
/// Uses the RFC 4648 standard alphabet with `=` padding. Empty content
/// yields an empty string with no prefix.
pub fn encode_data_uri(mime: &str, data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    let payload = STANDARD.encode(data);
    let mut uri = String::with_capacity(mime.len() + payload.len() + 13);
    uri.push_str("data:");
    uri.push_str(mime);
    uri.push_str(";base64,");
    uri.push_str(&payload);
    uri
}
