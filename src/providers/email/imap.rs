//! IMAP provider implementation.
//!
//! This module provides a [`MailboxProvider`] implementation over standard
//! IMAP, for mailboxes that aren't reached through the Gmail API.
//!
//! # Authentication
//!
//! Username and password (or app-specific password) are stored in the system
//! keychain as JSON, referenced by account ID.
//!
//! # Protocol Details
//!
//! - Uses IMAP4rev1 (RFC 3501) via `async-imap` over direct TLS
//! - IMAP has no thread model here, so every matching message is reported as
//!   its own thread with ID `folder:uid`
//! - Bodies are fetched with `BODY.PEEK[]` so the scan never sets `\Seen`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use mail_parser::{Addr, Message as ParsedMessage, MessageParser, PartType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use super::{MailboxProvider, ProviderError, Result};
use crate::domain::{
    AccountId, Address, Email, EmailId, ProviderConfig, ProviderType, Thread, ThreadId,
    ThreadSummary,
};
use crate::storage::KeychainAccess;

/// IMAP server configuration.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    /// IMAP server hostname.
    pub imap_host: String,
    /// IMAP server port (typically 993 for TLS).
    pub imap_port: u16,
    /// Folder searched for messages.
    pub folder: String,
}

impl ImapConfig {
    /// Creates a configuration for a typical TLS setup searching INBOX.
    pub fn tls(imap_host: impl Into<String>) -> Self {
        Self {
            imap_host: imap_host.into(),
            imap_port: 993,
            folder: "INBOX".to_string(),
        }
    }

    /// Builds the configuration from account settings.
    ///
    /// Returns `None` for non-IMAP provider configurations.
    pub fn from_provider_config(config: &ProviderConfig) -> Option<Self> {
        match config {
            ProviderConfig::Imap {
                imap_host,
                imap_port,
                folder,
            } => Some(Self {
                imap_host: imap_host.clone(),
                imap_port: *imap_port,
                folder: folder.clone(),
            }),
            ProviderConfig::Gmail {} => None,
        }
    }
}

/// Credentials stored in keychain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapCredentials {
    /// Username (usually email address).
    pub username: String,
    /// Password or app-specific password.
    pub password: String,
}

/// Type alias for the IMAP session with TLS (using tokio-util compat layer).
type ImapSession = async_imap::Session<Compat<TlsStream<TcpStream>>>;

/// IMAP email provider.
///
/// # Example
///
/// ```ignore
/// use unsubscriber::providers::email::{ImapConfig, ImapProvider, MailboxProvider};
///
/// let config = ImapConfig::tls("imap.example.com");
/// let mut provider = ImapProvider::new(account_id, config, KeychainAccess::new());
/// provider.authenticate().await?;
///
/// let threads = provider.search("unsubscribe").await?;
/// ```
pub struct ImapProvider {
    /// Account ID for keychain credential lookup.
    account_id: AccountId,
    /// Server configuration.
    config: ImapConfig,
    /// Keychain holding the login credentials.
    keychain: KeychainAccess,
    /// Credentials (loaded from keychain).
    credentials: Option<ImapCredentials>,
    /// IMAP session (connected when authenticated).
    session: Option<Arc<Mutex<ImapSession>>>,
    /// Whether the provider is authenticated and connected.
    authenticated: bool,
}

impl ImapProvider {
    /// Creates a new IMAP provider for the specified account.
    ///
    /// The provider is not connected until
    /// [`authenticate`](MailboxProvider::authenticate) is called.
    pub fn new(account_id: AccountId, config: ImapConfig, keychain: KeychainAccess) -> Self {
        Self {
            account_id,
            config,
            keychain,
            credentials: None,
            session: None,
            authenticated: false,
        }
    }

    /// Creates a new IMAP provider with explicit credentials.
    pub fn with_credentials(
        account_id: AccountId,
        config: ImapConfig,
        credentials: ImapCredentials,
    ) -> Self {
        Self {
            account_id,
            config,
            keychain: KeychainAccess::new(),
            credentials: Some(credentials),
            session: None,
            authenticated: false,
        }
    }

    /// Returns whether the provider is currently authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns the account ID for this provider.
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ImapConfig {
        &self.config
    }

    /// Loads credentials from the system keychain.
    async fn load_credentials_from_keychain(&self) -> Result<ImapCredentials> {
        let key = KeychainAccess::imap_credentials_key(&self.account_id.0);
        let creds_json = self
            .keychain
            .require(&key)
            .await
            .map_err(|e| ProviderError::Authentication(format!("no credentials found: {}", e)))?;

        serde_json::from_str(&creds_json)
            .map_err(|e| ProviderError::Authentication(format!("invalid credentials: {}", e)))
    }

    /// Establishes TLS connection to the IMAP server with futures compat wrapper.
    async fn connect_tls(&self) -> Result<Compat<TlsStream<TcpStream>>> {
        let tcp_stream = TcpStream::connect(format!(
            "{}:{}",
            self.config.imap_host, self.config.imap_port
        ))
        .await
        .map_err(|e| ProviderError::Connection(format!("TCP connect failed: {}", e)))?;

        let config = ClientConfig::builder()
            .with_root_certificates(tokio_rustls::rustls::RootCertStore::from_iter(
                webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
            ))
            .with_no_client_auth();

        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(self.config.imap_host.clone())
            .map_err(|e| ProviderError::Connection(format!("invalid server name: {}", e)))?;

        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| ProviderError::Connection(format!("TLS handshake failed: {}", e)))?;

        // async-imap speaks futures-io, tokio-rustls speaks tokio-io
        Ok(tls_stream.compat())
    }

    /// Gets the IMAP session.
    fn get_session(&self) -> Result<Arc<Mutex<ImapSession>>> {
        if !self.authenticated {
            return Err(ProviderError::Authentication(
                "not authenticated".to_string(),
            ));
        }
        self.session
            .clone()
            .ok_or_else(|| ProviderError::Connection("not connected".to_string()))
    }

    /// Builds a `UID SEARCH` query matching `text` anywhere in a message.
    fn search_query(text: &str) -> String {
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
        format!("TEXT \"{}\"", escaped)
    }

    /// Splits a `folder:uid` thread ID.
    fn parse_thread_id(thread_id: &ThreadId) -> Result<(&str, u32)> {
        let (folder, uid) = thread_id.0.rsplit_once(':').ok_or_else(|| {
            ProviderError::InvalidRequest(format!("invalid thread_id format: {}", thread_id))
        })?;
        let uid = uid
            .parse()
            .map_err(|_| ProviderError::InvalidRequest(format!("invalid UID: {}", uid)))?;
        Ok((folder, uid))
    }

    /// Parses a mail_parser Addr to our Address type.
    fn parse_address(addr: &Addr) -> Address {
        Address {
            email: addr.address().unwrap_or("").to_string(),
            name: addr.name().map(|s| s.to_string()),
        }
    }

    fn extract_from(message: &ParsedMessage) -> Option<Address> {
        message
            .from()
            .and_then(|addr| addr.as_list())
            .and_then(|list| list.first())
            .map(Self::parse_address)
    }

    /// Parses a raw RFC 5322 message into an Email.
    fn parse_message(raw: &[u8], thread_id: &ThreadId) -> Option<Email> {
        let message = MessageParser::default().parse(raw)?;

        let from = Self::extract_from(&message)
            .unwrap_or_else(|| Address::new("unknown@unknown.com"));

        let date = message
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
            .unwrap_or_else(Utc::now);

        // body_html() would synthesize HTML from a text part; only take real HTML
        let body_html = message.html_part(0).and_then(|part| match &part.body {
            PartType::Html(html) => Some(html.to_string()),
            _ => None,
        });
        let body_text = message.body_text(0).map(|s| s.into_owned());

        Some(Email {
            id: EmailId::from(thread_id.0.clone()),
            thread_id: thread_id.clone(),
            from,
            subject: message.subject().map(|s| s.to_string()),
            body_text,
            body_html,
            date,
        })
    }
}

#[async_trait]
impl MailboxProvider for ImapProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Imap
    }

    async fn authenticate(&mut self) -> Result<()> {
        if self.credentials.is_none() {
            self.credentials = Some(self.load_credentials_from_keychain().await?);
        }

        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("no credentials".to_string()))?;

        let tls_stream = self.connect_tls().await?;
        let client = async_imap::Client::new(tls_stream);

        let session = client
            .login(&credentials.username, &credentials.password)
            .await
            .map_err(|e| ProviderError::Authentication(format!("IMAP login failed: {:?}", e.0)))?;

        self.session = Some(Arc::new(Mutex::new(session)));
        self.authenticated = true;

        tracing::info!(account_id = %self.account_id, "IMAP provider authenticated");
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<ThreadSummary>> {
        let session_arc = self.get_session()?;
        let mut session = session_arc.lock().await;

        let folder = self.config.folder.as_str();
        session
            .select(folder)
            .await
            .map_err(|e| ProviderError::Connection(format!("SELECT failed: {}", e)))?;

        let uids = session
            .uid_search(Self::search_query(query))
            .await
            .map_err(|e| ProviderError::Connection(format!("SEARCH failed: {}", e)))?;

        // HashSet order is arbitrary; report oldest first like a mailbox listing
        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        tracing::debug!(folder, query, matches = uid_list.len(), "IMAP search complete");

        Ok(uid_list
            .into_iter()
            .map(|uid| ThreadSummary::new(ThreadId::from(format!("{}:{}", folder, uid))))
            .collect())
    }

    async fn fetch_thread(&self, thread_id: &ThreadId) -> Result<Thread> {
        let (folder, uid) = Self::parse_thread_id(thread_id)?;

        let session_arc = self.get_session()?;
        let mut session = session_arc.lock().await;

        session
            .select(folder)
            .await
            .map_err(|e| ProviderError::Connection(format!("SELECT failed: {}", e)))?;

        let stream = session
            .uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")
            .await
            .map_err(|e| ProviderError::Connection(format!("FETCH failed: {}", e)))?;
        futures::pin_mut!(stream);

        let mut email = None;
        while let Some(fetch_result) = stream.next().await {
            let fetch = fetch_result
                .map_err(|e| ProviderError::Connection(format!("FETCH stream: {}", e)))?;
            if fetch.uid != Some(uid) || email.is_some() {
                continue;
            }
            let raw = fetch.body().ok_or_else(|| {
                ProviderError::Internal(format!("no body returned for {}", thread_id))
            })?;
            email = Some(Self::parse_message(raw, thread_id).ok_or_else(|| {
                ProviderError::Internal(format!("unparseable message {}", thread_id))
            })?);
        }

        let email =
            email.ok_or_else(|| ProviderError::NotFound(format!("thread not found: {}", thread_id)))?;

        Ok(Thread {
            id: thread_id.clone(),
            subject: email.subject.clone(),
            messages: vec![email],
        })
    }
}
