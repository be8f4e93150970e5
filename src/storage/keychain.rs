//! Keychain access for secure credential storage.
//!
//! Wraps the keyring crate to provide OS-native credential storage. Provider
//! credentials are stored as JSON blobs, one entry per account.

use thiserror::Error;

/// Errors that can occur during keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn blocking task: {0}")]
    TaskFailed(String),
}

/// Result type for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;

/// Provides access to the OS keychain for credential storage.
#[derive(Debug, Clone)]
pub struct KeychainAccess {
    service_name: String,
}

impl KeychainAccess {
    /// Default service name for unsubscriber credentials.
    pub const DEFAULT_SERVICE: &'static str = "io.unsubscriber";

    /// Creates a new KeychainAccess with the default service name.
    pub fn new() -> Self {
        Self {
            service_name: Self::DEFAULT_SERVICE.to_string(),
        }
    }

    /// Creates a new KeychainAccess with a custom service name.
    ///
    /// Useful for testing to avoid interfering with real credentials.
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Retrieves a credential from the keychain.
    ///
    /// Returns `None` if no credential exists for the key.
    pub async fn retrieve(&self, key: &str) -> Result<Option<String>> {
        let service = self.service_name.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &key)?;
            match entry.get_password() {
                Ok(password) => Ok(Some(password)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(KeychainError::Keyring(e)),
            }
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    /// Retrieves a credential, treating a missing entry as an error.
    pub async fn require(&self, key: &str) -> Result<String> {
        self.retrieve(key)
            .await?
            .ok_or_else(|| KeychainError::NotFound(key.to_string()))
    }

    /// Returns the service name used for this keychain access.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Generates a keychain key for an account's Gmail OAuth credentials.
    pub fn gmail_credentials_key(account_id: &str) -> String {
        format!("gmail.credentials.{}", account_id)
    }

    /// Generates a keychain key for an account's IMAP credentials.
    pub fn imap_credentials_key(account_id: &str) -> String {
        format!("imap.credentials.{}", account_id)
    }
}

impl Default for KeychainAccess {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_service_name() {
        let keychain = KeychainAccess::new();
        assert_eq!(keychain.service_name(), KeychainAccess::DEFAULT_SERVICE);
    }

    #[test]
    fn custom_service_name() {
        let keychain = KeychainAccess::with_service("test.service");
        assert_eq!(keychain.service_name(), "test.service");
    }

    #[test]
    fn gmail_credentials_key_format() {
        let key = KeychainAccess::gmail_credentials_key("personal");
        assert_eq!(key, "gmail.credentials.personal");
    }

    #[test]
    fn imap_credentials_key_format() {
        let key = KeychainAccess::imap_credentials_key("work");
        assert_eq!(key, "imap.credentials.work");
    }

    // Tests that actually hit the keychain are skipped by default
    // because they require OS-level permissions and may leave artifacts.
    // Run with: cargo test --features keychain-integration-tests -- --ignored
    #[cfg(feature = "keychain-integration-tests")]
    mod integration {
        use super::*;

        #[tokio::test]
        #[ignore = "requires OS keychain access"]
        async fn require_reads_stored_entry() {
            let keychain = KeychainAccess::with_service("io.unsubscriber.test");
            let key = "test-credential";

            let entry = keyring::Entry::new(keychain.service_name(), key).unwrap();
            entry.set_password("secret").unwrap();

            let stored = keychain.require(key).await;
            entry.delete_credential().unwrap();

            assert_eq!(stored.unwrap(), "secret");
        }

        #[tokio::test]
        #[ignore = "requires OS keychain access"]
        async fn require_missing_entry() {
            let keychain = KeychainAccess::with_service("io.unsubscriber.test");
            let result = keychain.require("never-stored").await;
            assert!(matches!(result, Err(KeychainError::NotFound(_))));
        }
    }
}
