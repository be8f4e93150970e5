//! Domain types for the unsubscribe scan.
//!
//! Identifiers, messages, threads, and the links extracted from them.

mod account;
mod email;
mod link;
mod thread;
mod types;

pub use account::{ProviderConfig, ProviderType};
pub use email::{Address, Email};
pub use link::{Link, LinkCollection};
pub use thread::{Thread, ThreadSummary};
pub use types::{AccountId, EmailId, ThreadId};
