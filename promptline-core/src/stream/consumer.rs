//! Read loop turning a response body into appended text

use super::codec::FrameCodec;
use super::interpreter::{interpret, FramingMode};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Default cap on a single undelimited line (1 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Terminal failure of a stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("stream read error: {message}")]
    Transport { message: String },

    #[error("line exceeded {limit} bytes without a delimiter")]
    LineTooLong { limit: usize },
}

/// Options controlling end-of-stream and memory behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerOptions {
    /// Interpret a final line that has no trailing delimiter instead of dropping it
    pub flush_trailing_line: bool,

    /// Fail the stream once the leftover grows past this many bytes
    pub max_line_bytes: Option<usize>,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            flush_trailing_line: false,
            max_line_bytes: Some(DEFAULT_MAX_LINE_BYTES),
        }
    }
}

/// Counters reported when a stream completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: usize,
    pub bytes: usize,
    pub lines: usize,
    pub tokens: usize,
    /// Length of an undelimited final line that was not interpreted
    pub dropped_tail_bytes: usize,
}

/// Owned state of one stream: codec, accumulated text and counters
///
/// Every request gets its own instance; nothing here is shared.
#[derive(Debug)]
pub struct ConsumerState {
    mode: FramingMode,
    options: ConsumerOptions,
    codec: FrameCodec,
    accumulated: String,
    stats: StreamStats,
}

impl ConsumerState {
    pub fn new(mode: FramingMode, options: ConsumerOptions) -> Self {
        Self {
            mode,
            options,
            codec: FrameCodec::new(),
            accumulated: String::new(),
            stats: StreamStats::default(),
        }
    }

    /// Process one raw chunk, calling `on_append` for each token in order
    pub fn feed<F>(&mut self, chunk: &[u8], on_append: &mut F) -> Result<(), StreamError>
    where
        F: FnMut(&str),
    {
        self.stats.chunks += 1;
        self.stats.bytes += chunk.len();

        for line in self.codec.push(chunk) {
            self.apply_line(&line, on_append);
        }

        if let Some(limit) = self.options.max_line_bytes {
            if self.codec.leftover().len() > limit {
                return Err(StreamError::LineTooLong { limit });
            }
        }
        Ok(())
    }

    /// Close the stream and hand back the accumulated text
    pub fn finish<F>(mut self, on_append: &mut F) -> (String, StreamStats)
    where
        F: FnMut(&str),
    {
        if let Some(tail) = self.codec.finish() {
            if self.options.flush_trailing_line {
                self.apply_line(&tail, on_append);
            } else {
                debug!(bytes = tail.len(), "dropping undelimited final line");
                self.stats.dropped_tail_bytes = tail.len();
            }
        }
        (self.accumulated, self.stats)
    }

    /// Text accumulated so far
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    fn apply_line<F>(&mut self, line: &str, on_append: &mut F)
    where
        F: FnMut(&str),
    {
        self.stats.lines += 1;
        let frame = interpret(line, self.mode);
        if let Some(token) = frame.token() {
            if token.is_empty() {
                return;
            }
            self.stats.tokens += 1;
            self.accumulated.push_str(token);
            on_append(token);
        }
    }
}

/// Drives the read loop over a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConsumer {
    mode: FramingMode,
    options: ConsumerOptions,
}

impl StreamConsumer {
    pub fn new(mode: FramingMode) -> Self {
        Self {
            mode,
            options: ConsumerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConsumerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Consume `body` until it ends, appending every token through `on_append`
    ///
    /// Awaiting the next chunk is the only suspension point. On a transport
    /// error the tokens already appended stay appended and the error is
    /// returned once.
    pub async fn consume<S, E, F>(&self, body: S, mut on_append: F) -> Result<String, StreamError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
        F: FnMut(&str),
    {
        let mut state = ConsumerState::new(self.mode, self.options);
        let mut body = std::pin::pin!(body);

        while let Some(next) = body.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(
                        "stream aborted after {} chunks: {}",
                        state.stats.chunks, e
                    );
                    return Err(StreamError::Transport {
                        message: e.to_string(),
                    });
                }
            };
            debug!(len = chunk.len(), "received chunk");
            state.feed(&chunk, &mut on_append)?;
        }

        let (text, stats) = state.finish(&mut on_append);
        debug!(
            chunks = stats.chunks,
            bytes = stats.bytes,
            lines = stats.lines,
            tokens = stats.tokens,
            "stream completed"
        );
        Ok(text)
    }
}

/// Consume `body` with default options
pub async fn consume<S, E, F>(body: S, mode: FramingMode, on_append: F) -> Result<String, StreamError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
    F: FnMut(&str),
{
    StreamConsumer::new(mode).consume(body, on_append).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, String>> {
        let items: Vec<Result<Bytes, String>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_prefixed_across_chunks() {
        let mut seen = Vec::new();
        let text = consume(
            chunks(&["0:\"Hel\"\n0:", "\"lo\"\n", "e:{\"finishReason\":\"stop\"}\n"]),
            FramingMode::Prefixed,
            |t| seen.push(t.to_string()),
        )
        .await
        .unwrap();

        assert_eq!(text, "Hello");
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_raw_paragraph_breaks() {
        let text = consume(
            chunks(&["Para one\n", "\nPara", " two\n"]),
            FramingMode::Raw,
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(text, "Para one\nPara two");
    }

    #[tokio::test]
    async fn test_raw_keeps_carriage_returns() {
        let text = consume(chunks(&["a\r\n\r\nb\n"]), FramingMode::Raw, |_| {})
            .await
            .unwrap();
        assert_eq!(text, "a\r\rb");
    }

    #[tokio::test]
    async fn test_prefixed_tolerates_crlf() {
        let text = consume(chunks(&["0:\"a\"\r\n0:\"b\"\r\n"]), FramingMode::Prefixed, |_| {})
            .await
            .unwrap();
        assert_eq!(text, "ab");
    }

    #[tokio::test]
    async fn test_trailing_line_dropped_by_default() {
        let text = consume(chunks(&["0:\"a\"\n0:\"b\""]), FramingMode::Prefixed, |_| {})
            .await
            .unwrap();
        assert_eq!(text, "a");
    }

    #[tokio::test]
    async fn test_trailing_line_flushed_when_enabled() {
        let consumer = StreamConsumer::new(FramingMode::Prefixed).with_options(ConsumerOptions {
            flush_trailing_line: true,
            ..Default::default()
        });
        let text = consumer
            .consume(chunks(&["0:\"a\"\n0:\"b\""]), |_| {})
            .await
            .unwrap();
        assert_eq!(text, "ab");
    }

    #[tokio::test]
    async fn test_transport_error_keeps_appended_text() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"0:\"partial\"\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"0:\"never\"\n")),
        ]);
        let mut shown = String::new();
        let err = consume(body, FramingMode::Prefixed, |t| shown.push_str(t))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StreamError::Transport {
                message: "connection reset".to_string()
            }
        );
        assert_eq!(shown, "partial");
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let consumer = StreamConsumer::new(FramingMode::Raw).with_options(ConsumerOptions {
            flush_trailing_line: false,
            max_line_bytes: Some(4),
        });
        let err = consumer
            .consume(chunks(&["ok\n", "toolong"]), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, StreamError::LineTooLong { limit: 4 });
    }

    #[test]
    fn test_state_counts() {
        let mut state = ConsumerState::new(FramingMode::Prefixed, ConsumerOptions::default());
        let mut sink = |_: &str| {};
        state.feed(b"0:\"x\"\nf:{}\n0:\"\"\n0:\"y", &mut sink).unwrap();
        assert_eq!(state.accumulated(), "x");

        let (text, stats) = state.finish(&mut sink);
        assert_eq!(text, "x");
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.tokens, 1);
        assert_eq!(stats.dropped_tail_bytes, 4);
    }
}
