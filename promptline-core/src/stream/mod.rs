//! Streaming response decoding
//!
//! Responsibilities:
//! - Reassemble logical lines from arbitrarily sized body chunks
//! - Classify each line under the backend's framing convention
//! - Append decoded text in arrival order and notify the caller per token
//!
//! A final line without a trailing delimiter is dropped unless
//! [`ConsumerOptions::flush_trailing_line`] is set.

pub mod codec;
pub mod consumer;
pub mod interpreter;

pub use codec::{split, FrameCodec, Utf8Decoder};
pub use consumer::{
    consume, ConsumerOptions, ConsumerState, StreamConsumer, StreamError, StreamStats,
    DEFAULT_MAX_LINE_BYTES,
};
pub use interpreter::{interpret, Frame, FramingMode, TEXT_DELTA_MARKER};
