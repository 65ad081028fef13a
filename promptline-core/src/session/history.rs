//! In-memory session history

use crate::protocol::{BackendMode, Provider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One completed exchange, immutable once recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub backend_mode: BackendMode,
    pub provider: Provider,
    pub system_prompt: String,
    pub user_input: String,
    pub response: String,
}

/// Append-only list of completed exchanges
///
/// Entries are shared behind `Arc`, so handing one out never copies the text
/// and never allows it to change.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    entries: Vec<Arc<HistoryEntry>>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exchange and return its index
    pub fn push(&mut self, entry: HistoryEntry) -> usize {
        self.entries.push(Arc::new(entry));
        self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<Arc<HistoryEntry>> {
        self.entries.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().map(|e| e.as_ref())
    }
}
