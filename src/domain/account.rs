//! Account domain types.
//!
//! Describes which mailbox backend to scan and how to reach it.

use serde::{Deserialize, Serialize};

/// Type of mailbox provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Gmail REST API provider.
    Gmail,
    /// Standard IMAP provider.
    Imap,
}

/// Provider-specific connection configuration.
///
/// OAuth tokens and passwords are stored in the system keychain,
/// not in this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Gmail API configuration.
    Gmail {
        // OAuth tokens stored in keychain, referenced by account ID.
    },
    /// IMAP configuration.
    Imap {
        /// IMAP server hostname.
        imap_host: String,
        /// IMAP server port.
        #[serde(default = "default_imap_port")]
        imap_port: u16,
        /// Folder to search.
        #[serde(default = "default_folder")]
        folder: String,
    },
}

impl ProviderConfig {
    /// Returns the provider type this configuration selects.
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::Gmail {} => ProviderType::Gmail,
            ProviderConfig::Imap { .. } => ProviderType::Imap,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Gmail {}
    }
}

fn default_imap_port() -> u16 {
    993
}

fn default_folder() -> String {
    "INBOX".to_string()
}
