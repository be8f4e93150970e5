//! Business services layer.
//!
//! Services sit between the binary and the infrastructure layer:
//!
//! ```text
//!        main.rs (settings, logging)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (mailbox providers, HTTP fetcher)
//! ```
//!
//! - [`LinkExtractor`]: finds candidate unsubscribe links in message bodies
//! - [`UnsubscribeService`]: searches the mailbox, collects links, and
//!   requests each one

mod link_extractor;
mod unsubscribe_service;

pub use link_extractor::LinkExtractor;
pub use unsubscribe_service::{
    DispatchOutcome, LinkOutcome, RunSummary, UnsubscribeError, UnsubscribeResult,
    UnsubscribeService,
};
