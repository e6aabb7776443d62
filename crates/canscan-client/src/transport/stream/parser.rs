//! SSE (Server-Sent Events) parser
//!
//! Splits the SSE wire format into raw frames. Frame contents are not
//! interpreted here; that is the decoder's job.

use std::borrow::Cow;

use tracing::trace;

use crate::transport::RawFrame;

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    /// Bytes of an incomplete line
    buffer: Vec<u8>,
    /// Data lines of the event being accumulated
    data_buffer: String,
    /// Whether the current event has at least one data line
    has_data: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the parser and extract any complete frames
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RawFrame> {
        let mut frames = Vec::new();

        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<_>>();
            let line = &line[..line.len() - 1];

            // Handle \r\n line endings
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Process a single line of SSE data
    fn process_line(&mut self, line: &[u8]) -> Option<RawFrame> {
        // Empty line ends the event
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment line (keepalive)
        if line.starts_with(b":") {
            trace!("SSE keepalive/comment");
            return None;
        }

        // Malformed bytes are passed on so the decoder can count them
        let line: Cow<'_, str> = String::from_utf8_lossy(line);

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (&*line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data_buffer.push('\n');
                }
                self.data_buffer.push_str(value);
                self.has_data = true;
            }
            "event" | "id" | "retry" => {
                trace!("SSE {}: {}", field, value);
            }
            _ => {
                trace!("SSE unknown field: {}", field);
            }
        }

        None
    }

    fn dispatch(&mut self) -> Option<RawFrame> {
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(RawFrame::new(std::mem::take(&mut self.data_buffer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_event() {
        let mut parser = SseParser::new();

        let frames = parser.feed(b"data: {\"event\":\"done\"}\n\n");

        assert_eq!(frames, vec![RawFrame::new("{\"event\":\"done\"}")]);
    }

    #[test]
    fn test_parse_multiple_events() {
        let mut parser = SseParser::new();

        let frames = parser.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\r\n\r\n");

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].data, "{\"b\":2}");
    }

    #[test]
    fn test_parse_chunked_data() {
        let mut parser = SseParser::new();

        assert!(parser.feed(b"data: {\"event\":").is_empty());
        let frames = parser.feed(b"\"done\"}\n\n");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"event\":\"done\"}");
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut parser = SseParser::new();

        let frames = parser.feed(b"data: {\"event\":\ndata: \"done\"}\n\n");

        assert_eq!(frames[0].data, "{\"event\":\n\"done\"}");
    }

    #[test]
    fn test_ignore_comments_and_fields() {
        let mut parser = SseParser::new();

        let frames = parser.feed(b": keepalive\n\nevent: scan\nid: 7\nretry: 100\ndata: x\n\n");

        assert_eq!(frames, vec![RawFrame::new("x")]);
    }

    #[test]
    fn test_invalid_utf8_is_passed_through() {
        let mut parser = SseParser::new();

        let frames = parser.feed(b"data: \xff\xfe\n\n");

        assert_eq!(frames.len(), 1);
        assert!(frames[0].data.contains('\u{FFFD}'));
    }
}
