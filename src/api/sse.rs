//! Server-sent events
//!
//! Incremental `text/event-stream` decoding on top of a streaming response
//! body. Frames may be split across chunks at any byte.

use super::error::{ApiError, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// `event:` field, if the server set one
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
    /// Last `id:` seen on the stream
    pub id: Option<String>,
}

/// Line-oriented event-stream parser.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    event: Option<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let consumed = if self.buffer[pos] == b'\r' {
                match self.buffer.get(pos + 1) {
                    Some(b'\n') => pos + 2,
                    Some(_) => pos + 1,
                    // a lone \r at the end may be half of \r\n
                    None => break,
                }
            } else {
                pos + 1
            };

            let line = String::from_utf8_lossy(&self.buffer[..pos]).into_owned();
            self.buffer.drain(..consumed);

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(i) => {
                let value = &line[i + 1..];
                (&line[..i], value.strip_prefix(' ').unwrap_or(value))
            },
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            _ => {},
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}

/// Events read from an open subscription response.
pub struct EventStream {
    chunks: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
}

impl EventStream {
    pub fn new(response: reqwest::Response) -> Self {
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        Self {
            chunks,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    /// Next event in arrival order; `None` once the server closes the stream.
    pub async fn next_event(&mut self) -> Option<Result<SseEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            match self.chunks.next().await? {
                Ok(chunk) => self.pending.extend(self.decoder.feed(&chunk)),
                Err(e) => return Some(Err(ApiError::Transport(e))),
            }
        }
    }
}
