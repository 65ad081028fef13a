//! Protocol module for the outbound chat request
//!
//! This module defines the data exchanged with a backend collaborator:
//! - The provider and backend selectors
//! - The JSON request body and its validation contract

pub mod types;

pub use types::{
    BackendMode, ChatPayload, PayloadError, Provider, UnknownVariant, MAX_INPUT_LENGTH,
};
