//! Incremental framing for `data:`-prefixed server-sent-event lines.

/// Sentinel payload marking normal end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data: ";

/// Incremental extractor of `data:` payloads from a byte stream.
///
/// Chunks may arrive split at arbitrary byte boundaries; partial lines are
/// buffered until their trailing newline arrives. Lines without the `data: `
/// prefix (comments, blank separators) are ignored.
#[derive(Debug, Default)]
pub struct DataFrames {
    buffer: String,
}

impl DataFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk, returning the payloads of every line completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(payload) = line.trim_end().strip_prefix(DATA_PREFIX) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }
}
