//! Thread domain types.
//!
//! Search results come back as [`ThreadSummary`] handles; the full
//! [`Thread`] with message bodies is fetched separately.

use serde::{Deserialize, Serialize};

use super::{Email, ThreadId};

/// A complete email thread with all messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Provider identifier for this thread.
    pub id: ThreadId,
    /// Thread subject (from first message).
    pub subject: Option<String>,
    /// All messages in the thread, in provider order.
    pub messages: Vec<Email>,
}

impl Thread {
    /// Returns the messages in this thread.
    pub fn messages(&self) -> &[Email] {
        &self.messages
    }
}

/// A lightweight handle to a thread returned by a mailbox search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Provider identifier for this thread.
    pub id: ThreadId,
    /// Short preview text, when the provider supplies one.
    pub snippet: String,
}

impl ThreadSummary {
    /// Creates a summary with no snippet.
    pub fn new(id: impl Into<ThreadId>) -> Self {
        Self {
            id: id.into(),
            snippet: String::new(),
        }
    }
}
