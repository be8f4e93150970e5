//! unsubscriber - Bulk unsubscribe from mailing lists
//!
//! This crate searches a mailbox for messages mentioning "unsubscribe",
//! extracts the unsubscribe links from their bodies, and requests each link.
//! Mailbox access (Gmail API or IMAP) and HTTP are behind traits so the
//! orchestration can be tested without a network.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;

pub use services::{RunSummary, UnsubscribeService};
