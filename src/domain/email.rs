//! Email domain types.
//!
//! A message as seen by the unsubscribe scan: enough header data to log
//! where a link came from, plus both body renditions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EmailId, ThreadId};

/// An individual email message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    /// Provider identifier for this email.
    pub id: EmailId,
    /// Thread (conversation) this email belongs to.
    pub thread_id: ThreadId,
    /// Sender address.
    pub from: Address,
    /// Email subject line.
    pub subject: Option<String>,
    /// Plain text body content.
    pub body_text: Option<String>,
    /// HTML body content.
    pub body_html: Option<String>,
    /// Date and time the email was sent.
    pub date: DateTime<Utc>,
}

impl Email {
    /// Returns the body that gets scanned for links.
    ///
    /// HTML if present, otherwise plain text, otherwise empty.
    pub fn body(&self) -> &str {
        self.body_html
            .as_deref()
            .or(self.body_text.as_deref())
            .unwrap_or("")
    }
}

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Email address.
    pub email: String,
    /// Display name (e.g., "Weekly Digest").
    pub name: Option<String>,
}

impl Address {
    /// Creates a new address with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates a new address with email and display name.
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }

    /// Returns "Name <email>" when a name is present, otherwise the email.
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}
