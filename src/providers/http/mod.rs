//! Outbound HTTP for unsubscribe requests.
//!
//! - [`HttpFetcher`] - the single-method trait the dispatch loop depends on
//! - [`ReqwestFetcher`] - production implementation over `reqwest`

mod client;
mod traits;

pub use client::ReqwestFetcher;
pub use traits::{FetchError, FetchResponse, HttpFetcher};

#[cfg(test)]
pub use traits::MockHttpFetcher;
