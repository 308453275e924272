//! Opaque pagination cursor: a base64 encoding of the last-emitted entry id

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode an entry id as an opaque cursor string.
pub fn encode(entry_id: &str) -> String {
    STANDARD.encode(entry_id.as_bytes())
}

/// Decode a cursor back to an entry id. Invalid shape (bad base64 or
/// non-UTF8 payload) decodes to `None` rather than erroring — callers
/// treat an invalid cursor as "start from the first page".
pub fn decode(cursor: &str) -> Option<String> {
    let bytes = STANDARD.decode(cursor).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_entry_id() {
        let encoded = encode("01HXYZ0000000000000000ABCD");
        assert_eq!(decode(&encoded).as_deref(), Some("01HXYZ0000000000000000ABCD"));
    }

    #[test]
    fn invalid_base64_decodes_to_none() {
        assert!(decode("not valid base64!!!").is_none());
    }

    #[test]
    fn non_utf8_payload_decodes_to_none() {
        let encoded = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert!(decode(&encoded).is_none());
    }
}
