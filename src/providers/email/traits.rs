//! Mailbox provider trait definition.
//!
//! This module defines the [`MailboxProvider`] trait which abstracts over the
//! mailbox backends (Gmail API, IMAP) that the unsubscribe scan reads from.

use async_trait::async_trait;

use crate::domain::{ProviderType, Thread, ThreadId, ThreadSummary};

/// Result type alias for mailbox provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during mailbox provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Read-only access to a mailbox.
///
/// The scan only ever searches and reads; nothing here modifies the mailbox.
///
/// # Example
///
/// ```ignore
/// use unsubscriber::providers::email::MailboxProvider;
///
/// async fn bodies(provider: &impl MailboxProvider) -> Result<Vec<String>> {
///     let mut out = Vec::new();
///     for summary in provider.search("unsubscribe").await? {
///         let thread = provider.fetch_thread(&summary.id).await?;
///         out.extend(thread.messages().iter().map(|m| m.body().to_string()));
///     }
///     Ok(out)
/// }
/// ```
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    /// Returns the type of this provider.
    fn provider_type(&self) -> ProviderType;

    /// Authenticates with the mailbox provider.
    ///
    /// For Gmail this exchanges the refresh token for an access token.
    /// For IMAP this opens and logs in the session.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Authentication`] if credentials are invalid or expired.
    async fn authenticate(&mut self) -> Result<()>;

    /// Searches for threads matching a query using the provider's own search
    /// semantics.
    ///
    /// Returns the complete result set; implementations follow pagination
    /// internally.
    async fn search(&self, query: &str) -> Result<Vec<ThreadSummary>>;

    /// Fetches a complete thread with all message bodies.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if the thread does not exist.
    async fn fetch_thread(&self, thread_id: &ThreadId) -> Result<Thread>;
}
