//! External collaborators of the unsubscribe scan.
//!
//! - [`email`] - Mailbox providers (Gmail API, IMAP)
//! - [`http`] - HTTP fetcher used to follow unsubscribe links

pub mod email;
pub mod http;
