//! Raw adapter reply normalization

/// Prompt byte the adapter emits when a reply is complete.
pub(crate) const PROMPT: u8 = b'>';

/// Separator the adapter prints between blocks of a multi-frame reply.
pub(crate) const BLOCK_SEPARATOR: u8 = b':';

/// Strip framing from a raw adapter reply and decode the payload.
///
/// Carriage returns, line feeds, and spaces are dropped. A block separator
/// retracts the byte copied just before it: in a multi-frame reply the
/// adapter prints `<digit>:` ahead of each block, and that digit has
/// already been copied by the time the separator is seen. This only holds
/// for single-digit block counts (frames 0-9); longer replies would need a
/// real multi-frame parser. Everything from the prompt onwards is
/// discarded.
pub fn normalize_reply(raw: &[u8]) -> String {
    let mut payload: Vec<u8> = Vec::with_capacity(raw.len());
    for &byte in raw {
        match byte {
            b'\r' | b'\n' | b' ' => {}
            BLOCK_SEPARATOR => {
                payload.pop();
            }
            PROMPT => break,
            _ => payload.push(byte),
        }
    }
    String::from_utf8_lossy(&payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_whitespace_and_truncates_at_prompt() {
        assert_eq!(normalize_reply(b"41 0C 1A F8\r\r>"), "410C1AF8");
    }

    #[test]
    fn discards_bytes_after_prompt() {
        assert_eq!(normalize_reply(b"OK\r>garbage"), "OK");
    }

    #[test]
    fn block_separator_retracts_frame_digit() {
        // Two-frame reply: each frame is prefixed with "<digit>:".
        assert_eq!(normalize_reply(b"0:4101\r1:2345\r>"), "41012345");
    }

    #[test]
    fn leading_separator_on_empty_payload_is_harmless() {
        // The reference implementation would underflow its cursor here.
        assert_eq!(normalize_reply(b":AB>"), "AB");
    }

    #[test]
    fn reply_without_prompt_keeps_full_payload() {
        assert_eq!(normalize_reply(b"41 0D 3C"), "410D3C");
    }

    #[test]
    fn empty_reply_decodes_to_empty_string() {
        assert_eq!(normalize_reply(b""), "");
        assert_eq!(normalize_reply(b">"), "");
    }
}
