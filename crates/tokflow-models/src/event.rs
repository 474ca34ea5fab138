//! Normalized stream events and their wire encoding.

use serde::{Deserialize, Serialize};

use crate::sse::{DONE_SENTINEL, DataFrames};

/// One event on the relay's normalized token stream.
///
/// Tokens must be applied in emission order; `Done` terminates the stream;
/// no events follow `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token { text: String },
    Done,
    Error { message: String },
}

/// JSON payload of one token record: `{"content": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub content: String,
}

/// Decode the payload of one `data:` record.
///
/// `[DONE]` is the end-of-stream sentinel; anything else parses as a
/// [`TokenRecord`]. A payload that fails to parse, or carries empty text,
/// yields `None` and is skipped rather than failing the stream.
pub fn decode_payload(payload: &str) -> Option<StreamEvent> {
    if payload.trim() == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    let record: TokenRecord = serde_json::from_str(payload).ok()?;
    if record.content.is_empty() {
        return None;
    }
    Some(StreamEvent::Token {
        text: record.content,
    })
}

/// Encode an event as a full wire record, `data: <payload>\n\n`.
///
/// Faults are not wire events; the relay terminates the channel instead, so
/// `Error` has no encoding.
pub fn encode_record(event: &StreamEvent) -> Option<String> {
    match event {
        StreamEvent::Token { text } => {
            let payload = serde_json::to_string(&TokenRecord {
                content: text.clone(),
            })
            .ok()?;
            Some(format!("data: {}\n\n", payload))
        }
        StreamEvent::Done => Some(format!("data: {}\n\n", DONE_SENTINEL)),
        StreamEvent::Error { .. } => None,
    }
}

/// Incremental decoder from raw bytes to [`StreamEvent`]s.
#[derive(Debug, Default)]
pub struct EventDecoder {
    frames: DataFrames,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk, returning every event completed by it in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.frames
            .feed(chunk)
            .iter()
            .filter_map(|payload| decode_payload(payload))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(events: &[StreamEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(encode_record)
            .collect::<String>()
            .into_bytes()
    }

    #[test]
    fn test_token_order_is_preserved() {
        let wire = encode_all(&[
            StreamEvent::Token { text: "A".into() },
            StreamEvent::Token { text: "B".into() },
            StreamEvent::Token { text: "C".into() },
            StreamEvent::Done,
        ]);

        // Order must survive any read-boundary placement.
        for split in 0..wire.len() {
            let mut decoder = EventDecoder::new();
            let mut events = decoder.feed(&wire[..split]);
            events.extend(decoder.feed(&wire[split..]));

            let text: String = events
                .iter()
                .filter_map(|event| match event {
                    StreamEvent::Token { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect();
            assert_eq!(text, "ABC", "split at byte {split}");
            assert_eq!(events.last(), Some(&StreamEvent::Done));
        }
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let wire = encode_all(&[
            StreamEvent::Token { text: "Hel".into() },
            StreamEvent::Token { text: "lo".into() },
            StreamEvent::Done,
        ]);

        let first: Vec<_> = EventDecoder::new().feed(&wire);
        let second: Vec<_> = EventDecoder::new().feed(&wire);
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let mut decoder = EventDecoder::new();
        let events =
            decoder.feed(b"data: {\"content\":\"ok\"}\n\ndata: not-json\n\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![StreamEvent::Token { text: "ok".into() }, StreamEvent::Done]
        );
    }

    #[test]
    fn test_empty_content_is_skipped() {
        let mut decoder = EventDecoder::new();
        let events = decoder.feed(b"data: {\"content\":\"\"}\n\ndata: [DONE]\n\n");
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[test]
    fn test_done_sentinel() {
        assert_eq!(decode_payload("[DONE]"), Some(StreamEvent::Done));
        assert_eq!(decode_payload(" [DONE] "), Some(StreamEvent::Done));
    }

    #[test]
    fn test_error_has_no_wire_encoding() {
        assert!(
            encode_record(&StreamEvent::Error {
                message: "boom".into()
            })
            .is_none()
        );
    }
}
