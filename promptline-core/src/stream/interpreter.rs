//! Classification of logical lines under a framing convention

use serde::{Deserialize, Serialize};

/// Marker opening a text-delta frame in prefixed mode
pub const TEXT_DELTA_MARKER: &str = "0:";

/// Framing convention of a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// `0:"<escaped text>"` lines carry text, everything else is ignored
    Prefixed,
    /// Every line is text; an empty line is a paragraph break
    Raw,
}

/// Semantic classification of one logical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text to append to the output
    TextDelta(String),
    /// Empty line in raw mode, rendered as a single newline
    ParagraphBreak,
    /// Anything that carries no text
    NonPayload,
}

impl Frame {
    /// The payload token this frame contributes, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            Frame::TextDelta(text) => Some(text),
            Frame::ParagraphBreak => Some("\n"),
            Frame::NonPayload => None,
        }
    }
}

/// Classify `line` and extract its payload
///
/// Never fails: lines that do not fit the convention are [`Frame::NonPayload`].
/// Raw lines are passed through byte for byte.
pub fn interpret(line: &str, mode: FramingMode) -> Frame {
    match mode {
        FramingMode::Prefixed => interpret_prefixed(line),
        FramingMode::Raw if line.is_empty() => Frame::ParagraphBreak,
        FramingMode::Raw => Frame::TextDelta(line.to_owned()),
    }
}

fn interpret_prefixed(line: &str) -> Frame {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(wrapped) = line.strip_prefix(TEXT_DELTA_MARKER) else {
        return Frame::NonPayload;
    };

    // drop the opening and closing wrapper characters
    let mut chars = wrapped.chars();
    if chars.next().is_none() || chars.next_back().is_none() {
        return Frame::NonPayload;
    }

    Frame::TextDelta(chars.as_str().replace("\\n", "\n"))
}
