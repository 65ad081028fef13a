//! Session state: the request orchestrator and the exchange history

pub mod history;
pub mod orchestrator;

pub use history::{HistoryEntry, SessionHistory};
pub use orchestrator::{
    ActionError, FormState, InFlight, Orchestrator, RequestError, SubmitOutcome,
    SubmitRejection, ViewState, EMPTY_INPUT_MESSAGE, FAILURE_MESSAGE,
};
