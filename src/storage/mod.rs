//! Credential storage.
//!
//! Provider secrets live in the OS keychain, never in the settings file.

mod keychain;

pub use keychain::{KeychainAccess, KeychainError};
