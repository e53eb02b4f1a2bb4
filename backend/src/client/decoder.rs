use crate::utils::lines::LineBuffer;

const TEXT_DELTA_PREFIX: &str = "0:";

/// Incremental decoder for the chat completion body.
///
/// The body is newline-delimited. A line starting with `0:` carries a
/// JSON-encoded text delta; anything else, or a `0:` line whose payload is not
/// valid JSON, is taken as plain text. Lines are reassembled across chunk
/// boundaries before being interpreted.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineBuffer,
    text: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport chunk. Returns `true` if at least one non-empty line
    /// was processed, meaning the visible message should be re-rendered.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        let mut touched = false;
        for line in self.lines.push(chunk) {
            touched |= self.apply_line(&line);
        }
        touched
    }

    /// Processes a trailing line that had no terminating newline.
    pub fn finish(&mut self) -> bool {
        match self.lines.finish() {
            Some(line) => self.apply_line(&line),
            None => false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn apply_line(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        match line.strip_prefix(TEXT_DELTA_PREFIX) {
            Some(payload) => match serde_json::from_str::<serde_json::Value>(payload) {
                Ok(serde_json::Value::String(delta)) => self.text.push_str(&delta),
                Ok(_) => {}
                Err(_) => self.text.push_str(line),
            },
            None => self.text.push_str(line),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push(b"0:\"Hello\"\n"));
        assert!(decoder.push(b"0:\" world\"\n"));
        assert_eq!(decoder.text(), "Hello world");
    }

    #[test]
    fn plain_text_is_appended_verbatim() {
        let mut decoder = StreamDecoder::new();
        decoder.push(b"plain chunk\n");
        assert_eq!(decoder.text(), "plain chunk");
    }

    #[test]
    fn malformed_delta_falls_back_to_raw_line() {
        let mut decoder = StreamDecoder::new();
        decoder.push(b"0:\"ok\"\n0:{broken\n");
        assert_eq!(decoder.text(), "ok0:{broken");
    }

    #[test]
    fn non_string_payload_contributes_nothing() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push(b"0:42\n0:\"a\"\n"));
        assert_eq!(decoder.text(), "a");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut decoder = StreamDecoder::new();
        assert!(!decoder.push(b"\n  \n"));
        assert_eq!(decoder.text(), "");
    }

    #[test]
    fn frame_split_across_chunks_is_decoded_once() {
        let mut decoder = StreamDecoder::new();
        assert!(!decoder.push(b"0:\"Nam"));
        assert!(decoder.push(b"aste\"\n0:\"!\""));
        assert_eq!(decoder.text(), "Namaste");
        assert!(decoder.finish());
        assert_eq!(decoder.into_text(), "Namaste!");
    }

    #[test]
    fn escaped_characters_are_unescaped() {
        let mut decoder = StreamDecoder::new();
        decoder.push("0:\"line one\\nline two \\u0926\"\n".as_bytes());
        assert_eq!(decoder.text(), "line one\nline two द");
    }
}
