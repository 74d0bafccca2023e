//! Newline framing for the relayed agent stream.
//!
//! Each line is either bare JSON or an SSE style `data: <json>` line. Lines
//! may be split across any number of network chunks, including in the middle
//! of a multi-byte UTF-8 sequence, so the decoder buffers raw bytes and only
//! interprets complete lines.

use serde_json::Value;
use tracing::{debug, warn};

use amber_core::{InvokeError, StreamEvent};

/// Parse one complete line into an event.
///
/// `Ok(None)` means the line carries no event (blank, SSE comment or
/// non-data field, `[DONE]`). A malformed payload is a
/// [`InvokeError::FrameParse`]; callers log and skip it.
pub fn parse_frame(line: &str) -> Result<Option<StreamEvent>, InvokeError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None if is_sse_field(line) => return Ok(None),
        None => line,
    };
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(payload)
        .map_err(|e| InvokeError::FrameParse(format!("invalid JSON: {}", e)))?;

    if let Some(event) = statusless_error(&value) {
        return Ok(Some(event));
    }

    let event: StreamEvent = serde_json::from_value(value)
        .map_err(|e| InvokeError::FrameParse(format!("unrecognized event: {}", e)))?;
    if let StreamEvent::ToolExecution { tool, .. } = &event {
        if tool.trim().is_empty() {
            return Err(InvokeError::FrameParse("tool_execution without a tool name".into()));
        }
    }
    Ok(Some(event))
}

fn is_sse_field(line: &str) -> bool {
    ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
}

/// The agent runtime reports payload problems as `{"error": "..."}` without a
/// `status`; those end the invocation like a regular `error` event.
fn statusless_error(value: &Value) -> Option<StreamEvent> {
    let object = value.as_object()?;
    if object.contains_key("status") {
        return None;
    }
    let error = object.get("error")?.as_str()?;
    Some(StreamEvent::Error {
        error: error.to_string(),
        message: object
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Incremental line decoder. Feed it chunks in arrival order with
/// [`push`](Self::push) and call [`finish`](Self::finish) once the stream ends.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Bytes at the front of `buffer` already known to contain no newline.
    scanned: usize,
    dropped: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.scanned = 0;
            if let Some(event) = self.decode_line(&line[..end]) {
                events.push(event);
            }
        }
        self.scanned = self.buffer.len();
        events
    }

    /// Flush a trailing line that arrived without a final newline.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    /// Lines that could not be decoded so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                self.dropped += 1;
                warn!(error = %e, len = raw.len(), "dropping frame with invalid UTF-8");
                return None;
            }
        };
        match parse_frame(line) {
            Ok(Some(event)) => {
                debug!(status = event.status(), "decoded frame");
                Some(event)
            }
            Ok(None) => None,
            Err(e) => {
                self.dropped += 1;
                warn!(error = %e, line = %truncate(line, 200), "dropping malformed frame");
                None
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
