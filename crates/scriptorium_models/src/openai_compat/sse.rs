//! Incremental server-sent-event line decoder.

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload
    Data(String),
    /// The `data: [DONE]` terminator
    Done,
}

/// Splits a byte stream into SSE `data:` events.
///
/// Bytes are buffered until a full line arrives, so multi-byte characters and
/// lines split across network chunks decode correctly.
///
/// # Examples
///
/// ```
/// use scriptorium_models::{SseDecoder, SseEvent};
///
/// let mut decoder = SseDecoder::default();
/// assert!(decoder.push(b"data: {\"a\"").is_empty());
/// assert_eq!(
///     decoder.push(b":1}\n\ndata: [DONE]\n"),
///     vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
/// );
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feed bytes, returning every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(event) = Self::decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final unterminated line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.pending);
        Self::decode_line(&line)
    }

    fn decode_line(line: &[u8]) -> Option<SseEvent> {
        let line = String::from_utf8_lossy(line);
        let payload = line.trim().strip_prefix("data:")?.trim();
        match payload {
            "" => None,
            "[DONE]" => Some(SseEvent::Done),
            data => Some(SseEvent::Data(data.to_string())),
        }
    }
}
