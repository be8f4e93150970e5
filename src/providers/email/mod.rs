//! Mailbox provider implementations.
//!
//! This module contains the [`MailboxProvider`] trait and implementations for
//! different mailbox backends:
//!
//! - [`GmailProvider`] - Gmail REST API with OAuth 2.0
//! - [`ImapProvider`] - Standard IMAP over TLS
//!
//! Both are read-only: the unsubscribe scan searches and reads bodies, and
//! never moves, flags, or deletes anything.
//!
//! # Example
//!
//! ```ignore
//! use unsubscriber::providers::email::{MailboxProvider, ImapConfig, ImapProvider};
//!
//! async fn count_matches(provider: &dyn MailboxProvider) -> usize {
//!     provider
//!         .search("unsubscribe")
//!         .await
//!         .map(|threads| threads.len())
//!         .unwrap_or(0)
//! }
//! ```

mod gmail;
mod imap;
mod traits;

pub use gmail::{GmailCredentials, GmailProvider};
pub use imap::{ImapConfig, ImapCredentials, ImapProvider};
pub use traits::{MailboxProvider, ProviderError, Result};
