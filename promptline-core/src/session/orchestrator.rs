//! Request orchestration: form state, view state machine and history commits
//!
//! The view moves `Idle -> Loading -> Done` on success and back to `Idle`
//! with an error message on failure. `Done` returns to `Idle` only through
//! [`Orchestrator::reset`]. Only one request can be in flight: the view state
//! is the guard. A request whose [`InFlight`] ticket is dropped before
//! [`Orchestrator::finish`] (for example a cancelled `submit` future) counts
//! as failed.

use super::history::{HistoryEntry, SessionHistory};
use crate::config::PromptlineConfig;
use crate::http::{ChatTransport, RequestOptions, TransportError};
use crate::protocol::{BackendMode, ChatPayload, PayloadError, Provider, MAX_INPUT_LENGTH};
use crate::stream::{ConsumerOptions, StreamConsumer, StreamError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

/// Message shown when the user input is empty
pub const EMPTY_INPUT_MESSAGE: &str = "User Input is required.";

/// Message shown for any failed request
pub const FAILURE_MESSAGE: &str = "An error has occurred. Please try again.";

/// Phase of the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    /// Form editable, ready to submit
    #[default]
    Idle,
    /// A request is streaming
    Loading,
    /// A response is shown; reset before submitting again
    Done,
}

/// Values entered in the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub backend_mode: BackendMode,
    pub provider: Provider,
    pub system_prompt: String,
    pub user_input: String,
}

/// Why a submission did not start a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("a request is already in flight")]
    Busy,

    #[error("the form is read-only until it is reset")]
    FormLocked,

    #[error("invalid input: {0}")]
    Invalid(PayloadError),

    #[error("request {0} is not the active request")]
    Stale(Uuid),
}

/// Failure of a started request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Failure of a form or history action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("a request is in flight")]
    Busy,

    #[error("the form is read-only until it is reset")]
    FormLocked,

    #[error("no history entry at index {index} (history has {len})")]
    NoSuchEntry { index: usize, len: usize },
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stream completed and was committed to history
    Completed { history_index: usize },
    /// Nothing was sent
    Rejected(SubmitRejection),
    /// The request was sent and failed; nothing was committed
    Failed(RequestError),
}

/// View state shared between the orchestrator and its in-flight ticket
#[derive(Debug, Default)]
struct Progress {
    state: ViewState,
    active_request: Option<Uuid>,
    error_message: Option<String>,
}

impl Progress {
    fn fail(&mut self) {
        self.state = ViewState::Idle;
        self.active_request = None;
        self.error_message = Some(FAILURE_MESSAGE.to_string());
    }
}

/// Fails the request if its ticket goes away without being settled
#[derive(Debug)]
struct AbandonGuard {
    request_id: Uuid,
    progress: Arc<watch::Sender<Progress>>,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        let request_id = self.request_id;
        let abandoned = self.progress.send_if_modified(|progress| {
            if progress.active_request != Some(request_id) {
                return false;
            }
            progress.fail();
            true
        });
        if abandoned {
            warn!("Request abandoned before completion [request_id: {}]", request_id);
        }
    }
}

/// Ticket for a request that passed the guards and is now `Loading`
///
/// Created by [`Orchestrator::begin`], driven by [`InFlight::run`] and
/// settled by [`Orchestrator::finish`]. Dropping it unsettled returns the
/// orchestrator to `Idle` with the failure message.
#[derive(Debug)]
pub struct InFlight {
    request_id: Uuid,
    mode: BackendMode,
    payload: ChatPayload,
    consumer: StreamConsumer,
    timeout: Option<Duration>,
    display: Arc<watch::Sender<String>>,
    _guard: AbandonGuard,
}

impl InFlight {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn payload(&self) -> &ChatPayload {
        &self.payload
    }

    /// Send the request and stream the answer into the display buffer
    ///
    /// `on_append` sees every token right after it is published.
    pub async fn run<T, F>(&self, transport: &T, mut on_append: F) -> Result<String, RequestError>
    where
        T: ChatTransport + ?Sized,
        F: FnMut(&str),
    {
        let mut options = RequestOptions::new().with_request_id(self.request_id);
        if let Some(timeout) = self.timeout {
            options = options.with_timeout(timeout);
        }

        let body = transport.open_stream(self.mode, &self.payload, options).await?;

        let display = &self.display;
        let text = self
            .consumer
            .consume(body, |token| {
                display.send_modify(|shown| shown.push_str(token));
                on_append(token);
            })
            .await?;
        Ok(text)
    }
}

/// Owns the view state, the form, the display buffer and the history
pub struct Orchestrator<T> {
    transport: T,
    consumer_options: ConsumerOptions,
    max_input_length: usize,
    request_timeout: Option<Duration>,
    form: FormState,
    progress: Arc<watch::Sender<Progress>>,
    display: Arc<watch::Sender<String>>,
    history: SessionHistory,
}

impl<T: ChatTransport> Orchestrator<T> {
    /// Create an orchestrator with default settings
    pub fn new(transport: T) -> Self {
        let (display, _) = watch::channel(String::new());
        let (progress, _) = watch::channel(Progress::default());
        Self {
            transport,
            consumer_options: ConsumerOptions::default(),
            max_input_length: MAX_INPUT_LENGTH,
            request_timeout: None,
            form: FormState::default(),
            progress: Arc::new(progress),
            display: Arc::new(display),
            history: SessionHistory::new(),
        }
    }

    /// Create an orchestrator using the stream, limit and form defaults of `config`
    pub fn from_config(transport: T, config: &PromptlineConfig) -> Self {
        let mut orchestrator = Self::new(transport);
        orchestrator.consumer_options = config.stream.consumer_options();
        orchestrator.max_input_length = config.defaults.max_input_length;
        orchestrator.request_timeout = config.connection.request_timeout();
        orchestrator.form.backend_mode = config.defaults.backend;
        orchestrator.form.provider = config.defaults.provider;
        orchestrator
    }

    pub fn state(&self) -> ViewState {
        self.progress.borrow().state
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Message to show next to the form, if any
    pub fn error_message(&self) -> Option<String> {
        self.progress.borrow().error_message.clone()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the text currently displayed
    pub fn display_text(&self) -> String {
        self.display.borrow().clone()
    }

    /// Receive a new display snapshot after every appended token
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.display.subscribe()
    }

    pub fn set_backend_mode(&mut self, mode: BackendMode) -> Result<(), ActionError> {
        self.editable()?;
        self.form.backend_mode = mode;
        Ok(())
    }

    pub fn set_provider(&mut self, provider: Provider) -> Result<(), ActionError> {
        self.editable()?;
        self.form.provider = provider;
        Ok(())
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) -> Result<(), ActionError> {
        self.editable()?;
        self.form.system_prompt = prompt.into();
        Ok(())
    }

    pub fn set_user_input(&mut self, input: impl Into<String>) -> Result<(), ActionError> {
        self.editable()?;
        self.form.user_input = input.into();
        Ok(())
    }

    fn editable(&self) -> Result<(), ActionError> {
        match self.state() {
            ViewState::Idle => Ok(()),
            ViewState::Loading => Err(ActionError::Busy),
            ViewState::Done => Err(ActionError::FormLocked),
        }
    }

    /// Check the guards and move to `Loading`
    ///
    /// A rejection while `Loading` or `Done` leaves every field untouched. A
    /// validation failure only sets the error message.
    pub fn begin(&mut self) -> Result<InFlight, SubmitRejection> {
        match self.state() {
            ViewState::Loading => return Err(SubmitRejection::Busy),
            ViewState::Done => return Err(SubmitRejection::FormLocked),
            ViewState::Idle => {}
        }

        let payload = ChatPayload::new(
            self.form.provider,
            self.form.system_prompt.clone(),
            self.form.user_input.clone(),
        );
        if let Err(e) = payload.validate(self.max_input_length) {
            self.progress
                .send_modify(|progress| progress.error_message = Some(validation_message(&e)));
            return Err(SubmitRejection::Invalid(e));
        }

        let request_id = Uuid::new_v4();
        let mode = self.form.backend_mode;
        info!(
            "Submitting to {} via {} backend [request_id: {}]",
            payload.current_model, mode, request_id
        );

        self.display.send_replace(String::new());
        self.progress.send_modify(|progress| {
            progress.state = ViewState::Loading;
            progress.active_request = Some(request_id);
            progress.error_message = None;
        });

        Ok(InFlight {
            request_id,
            mode,
            payload,
            consumer: StreamConsumer::new(mode.framing()).with_options(self.consumer_options),
            timeout: self.request_timeout,
            display: Arc::clone(&self.display),
            _guard: AbandonGuard {
                request_id,
                progress: Arc::clone(&self.progress),
            },
        })
    }

    /// Apply the outcome of a request started by [`Orchestrator::begin`]
    pub fn finish(
        &mut self,
        in_flight: InFlight,
        outcome: Result<String, RequestError>,
    ) -> SubmitOutcome {
        if self.progress.borrow().active_request != Some(in_flight.request_id) {
            warn!("Ignoring outcome of stale request {}", in_flight.request_id);
            return SubmitOutcome::Rejected(SubmitRejection::Stale(in_flight.request_id));
        }

        match outcome {
            Ok(text) => {
                info!(
                    "Request completed with {} characters [request_id: {}]",
                    text.chars().count(),
                    in_flight.request_id
                );
                self.display.send_replace(text.clone());
                self.progress.send_modify(|progress| {
                    progress.state = ViewState::Done;
                    progress.active_request = None;
                });
                let history_index = self.history.push(HistoryEntry {
                    backend_mode: in_flight.mode,
                    provider: in_flight.payload.current_model,
                    system_prompt: in_flight.payload.sys_prompt,
                    user_input: in_flight.payload.user_data,
                    response: text,
                });
                SubmitOutcome::Completed { history_index }
            }
            Err(e) => {
                warn!("Request failed [request_id: {}]: {}", in_flight.request_id, e);
                self.progress.send_modify(Progress::fail);
                SubmitOutcome::Failed(e)
            }
        }
    }

    /// Submit the form and stream the answer
    pub async fn submit(&mut self) -> SubmitOutcome {
        self.submit_with(|_| {}).await
    }

    /// Submit the form, calling `on_append` for every streamed token
    pub async fn submit_with<F>(&mut self, on_append: F) -> SubmitOutcome
    where
        F: FnMut(&str),
    {
        let in_flight = match self.begin() {
            Ok(in_flight) => in_flight,
            Err(rejection) => return SubmitOutcome::Rejected(rejection),
        };
        let outcome = in_flight.run(&self.transport, on_append).await;
        self.finish(in_flight, outcome)
    }

    /// Clear the prompts, the display and the error, and return to `Idle`
    pub fn reset(&mut self) -> Result<(), ActionError> {
        if self.state() == ViewState::Loading {
            return Err(ActionError::Busy);
        }
        self.form.system_prompt.clear();
        self.form.user_input.clear();
        self.display.send_replace(String::new());
        self.progress.send_modify(|progress| {
            progress.state = ViewState::Idle;
            progress.error_message = None;
        });
        Ok(())
    }

    /// Show a past exchange: restore its form values and response
    pub fn view_history(&mut self, index: usize) -> Result<(), ActionError> {
        if self.state() == ViewState::Loading {
            return Err(ActionError::Busy);
        }
        let entry = self.history.get(index).ok_or(ActionError::NoSuchEntry {
            index,
            len: self.history.len(),
        })?;

        self.form = FormState {
            backend_mode: entry.backend_mode,
            provider: entry.provider,
            system_prompt: entry.system_prompt.clone(),
            user_input: entry.user_input.clone(),
        };
        self.display.send_replace(entry.response.clone());
        self.progress.send_modify(|progress| {
            progress.state = ViewState::Done;
            progress.error_message = None;
        });
        Ok(())
    }
}

fn validation_message(error: &PayloadError) -> String {
    match error {
        PayloadError::EmptyUserInput => EMPTY_INPUT_MESSAGE.to_string(),
        PayloadError::TooLong { field, max, .. } => {
            let label = match *field {
                "sysPrompt" => "System Prompt",
                _ => "User Input",
            };
            format!("{} must be at most {} characters.", label, max)
        }
    }
}
