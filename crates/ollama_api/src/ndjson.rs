use serde_json::Value;
use tracing::trace;

use crate::extract::extract_text;

/// Incremental decoder for newline-delimited JSON text streams.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences and JSON objects split across transport chunks decode intact.
#[derive(Debug, Default)]
pub struct NdjsonLineDecoder {
    buffer: Vec<u8>,
}

impl NdjsonLineDecoder {
    /// Feed arbitrary bytes into the decoder and drain fragments for every
    /// completed line, in line order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut fragments = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(fragment) = decode_line_bytes(&line[..newline]) {
                fragments.push(fragment);
            }
        }

        fragments
    }

    /// Flushes a trailing line that was not newline-terminated when the stream closed.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line_bytes(&rest)
    }
}

/// Maps one wire line to its fragment.
///
/// Empty lines are heartbeats and yield `None`. A line that is not JSON, or JSON of
/// an unknown shape, yields the line text itself, whitespace-only lines included.
pub fn decode_line(line: &str) -> Option<String> {
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(line) {
        Ok(value) => Some(extract_text(&value).unwrap_or_else(|| {
            trace!(line, "no known payload shape, forwarding raw line");
            line.to_string()
        })),
        Err(error) => {
            trace!(line, %error, "line is not JSON, forwarding raw line");
            Some(line.to_string())
        }
    }
}

fn decode_line_bytes(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    decode_line(&String::from_utf8_lossy(line))
}

#[cfg(test)]
mod tests {
    use super::NdjsonLineDecoder;

    #[test]
    fn lines_split_across_chunks_are_reassembled() {
        let mut decoder = NdjsonLineDecoder::default();

        assert!(decoder.feed(br#"{"message":{"content":"He"#).is_empty());
        assert_eq!(decoder.feed(b"l\"}}\n"), vec!["Hel".to_string()]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn only_empty_lines_are_skipped() {
        let mut decoder = NdjsonLineDecoder::default();

        assert_eq!(
            decoder.feed(b"\n\r\n   \n{\"response\":\"x\"}\n"),
            vec!["   ".to_string(), "x".to_string()]
        );
    }

    #[test]
    fn multibyte_characters_split_across_chunks_survive() {
        let payload = "{\"response\":\"caf\u{e9}\"}\n".as_bytes();
        let split = payload.len() - 4;
        let mut decoder = NdjsonLineDecoder::default();

        assert!(decoder.feed(&payload[..split]).is_empty());
        assert_eq!(decoder.feed(&payload[split..]), vec!["caf\u{e9}".to_string()]);
    }

    #[test]
    fn unterminated_final_line_is_flushed_on_finish() {
        let mut decoder = NdjsonLineDecoder::default();
        assert!(decoder.feed(br#"{"response":"tail"}"#).is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
