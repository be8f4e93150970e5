//! HTTP fetcher trait definition.
//!
//! The unsubscribe dispatch only needs "GET this URL and tell me the status",
//! so that is all [`HttpFetcher`] exposes.

use async_trait::async_trait;

/// Transport-level failures: the request never produced a status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The link could not be turned into a request (bad scheme, unparseable URL).
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// DNS, TCP, or TLS failure while connecting.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other transport failure, including redirect loops.
    #[error("request failed: {0}")]
    Request(String),
}

/// The part of an HTTP response the dispatch looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final HTTP status code, after redirects.
    pub status: u16,
}

impl FetchResponse {
    /// Creates a response with the given status.
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    /// Returns true for exactly 200 OK.
    ///
    /// Other 2xx codes (202, 204) count as failures.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Issues HTTP GET requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Sends a GET request to `url` and returns the response status.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when no response was received at all.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_is_ok() {
        assert!(FetchResponse::new(200).is_ok());
        assert!(!FetchResponse::new(204).is_ok());
        assert!(!FetchResponse::new(404).is_ok());
        assert!(!FetchResponse::new(500).is_ok());
    }

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Connect("dns error".to_string());
        assert_eq!(err.to_string(), "connection failed: dns error");

        let err = FetchError::InvalidUrl("http://".to_string());
        assert!(err.to_string().starts_with("invalid url"));
    }
}
