//! Line reassembly for chunked response bodies
//!
//! Transports hand out chunks with no regard for line boundaries. The codec
//! carries the undelimited tail of each chunk (the *leftover*) into the next
//! one, so every logical line is emitted exactly once and in order.

/// Line delimiter of both framing conventions
pub const LINE_DELIMITER: char = '\n';

/// Split `previous_leftover + chunk` into complete lines and a new leftover
///
/// All pieces but the last are complete lines. The last piece, possibly empty,
/// may have been cut by the chunk boundary and is returned as the new
/// leftover instead of being emitted.
pub fn split(previous_leftover: &str, chunk: &str) -> (Vec<String>, String) {
    let mut text = String::with_capacity(previous_leftover.len() + chunk.len());
    text.push_str(previous_leftover);
    text.push_str(chunk);

    let mut lines: Vec<String> = text.split(LINE_DELIMITER).map(str::to_owned).collect();
    let leftover = lines.pop().unwrap_or_default();
    (lines, leftover)
}

/// Incremental UTF-8 decoder
///
/// A multi-byte character cut by a chunk boundary is held back until the rest
/// of its bytes arrive. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` as forms complete characters
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        let mut out = String::with_capacity(buf.len());
        let mut rest: &[u8] = &buf;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // prefix up to `valid_up_to` is always valid UTF-8
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // incomplete sequence at the end, wait for more bytes
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Bytes held back waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flush the decoder at end of stream
    ///
    /// A truncated character left in the buffer decodes to U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Per-request codec state: UTF-8 decoder plus leftover
#[derive(Debug, Default)]
pub struct FrameCodec {
    decoder: Utf8Decoder,
    leftover: String,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk and return the lines it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        let (lines, leftover) = split(&self.leftover, &text);
        self.leftover = leftover;
        lines
    }

    /// The current undelimited tail
    pub fn leftover(&self) -> &str {
        &self.leftover
    }

    /// End of stream: return the undelimited final line, if any
    ///
    /// Whether that line is interpreted is the caller's decision.
    pub fn finish(&mut self) -> Option<String> {
        let tail = self.decoder.finish();
        self.leftover.push_str(&tail);
        if self.leftover.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.leftover))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_partial_tail() {
        let (lines, leftover) = split("", "0:\"Hel\"\n0:\"l");
        assert_eq!(lines, vec!["0:\"Hel\"".to_string()]);
        assert_eq!(leftover, "0:\"l");

        let (lines, leftover) = split(&leftover, "o\"\n");
        assert_eq!(lines, vec!["0:\"lo\"".to_string()]);
        assert_eq!(leftover, "");
    }

    #[test]
    fn test_split_empty_lines_are_lines() {
        let (lines, leftover) = split("", "a\n\nb\n");
        assert_eq!(lines, vec!["a", "", "b"]);
        assert!(leftover.is_empty());
    }

    #[test]
    fn test_split_without_delimiter() {
        let (lines, leftover) = split("par", "tial");
        assert!(lines.is_empty());
        assert_eq!(leftover, "partial");
    }

    #[test]
    fn test_decoder_joins_split_character() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8Decoder::new();
        // 'é' is two bytes starting at index 1
        assert_eq!(decoder.decode(&bytes[..2]), "h");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(&bytes[2..]), "éllo");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xff, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_truncated_at_end() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xe2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_codec_finish_returns_tail() {
        let mut codec = FrameCodec::new();
        assert_eq!(codec.push(b"one\ntw"), vec!["one"]);
        assert_eq!(codec.leftover(), "tw");
        assert_eq!(codec.finish().as_deref(), Some("tw"));
        assert_eq!(codec.finish(), None);
    }
}
