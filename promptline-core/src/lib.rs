//! Promptline Core Library
//!
//! This crate sends a system prompt and a user message to a chat backend and
//! decodes the streamed answer incrementally, keeping an in-memory history of
//! completed exchanges.

pub mod config;
pub mod http;
pub mod protocol;
pub mod session;
pub mod stream;

pub use config::PromptlineConfig;
pub use http::{ChatTransport, HttpClient};
pub use protocol::{BackendMode, ChatPayload, Provider};
pub use session::{Orchestrator, SubmitOutcome, ViewState};
pub use stream::{FramingMode, StreamConsumer};

/// Returns the version of the Promptline Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
