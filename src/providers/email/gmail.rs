//! Gmail API provider implementation.
//!
//! This module provides a [`MailboxProvider`] implementation using the Gmail
//! REST API. It handles OAuth 2.0 token refresh, thread search, and fetching
//! full message bodies.
//!
//! # Authentication
//!
//! Gmail uses OAuth 2.0. The refresh token and client credentials are stored
//! in the system keychain as JSON, referenced by account ID. An access token
//! is obtained from the refresh token on [`authenticate`](MailboxProvider::authenticate).
//!
//! # API Usage
//!
//! This provider uses the Gmail API v1:
//! - `users.threads.list` with `q=` for search (paged via `nextPageToken`)
//! - `users.threads.get` with `format=full` for message bodies

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use serde::{Deserialize, Serialize};

use super::{MailboxProvider, ProviderError, Result};
use crate::domain::{
    AccountId, Address, Email, EmailId, ProviderType, Thread, ThreadId, ThreadSummary,
};
use crate::storage::KeychainAccess;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Threads requested per search page (API maximum is 500).
const SEARCH_PAGE_SIZE: u32 = 100;

/// Gmail API thread list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    threads: Option<Vec<GmailThreadRef>>,
    next_page_token: Option<String>,
}

/// Thread reference as returned by `threads.list`.
#[derive(Debug, Deserialize)]
struct GmailThreadRef {
    id: String,
    snippet: Option<String>,
}

/// Gmail API thread with messages.
#[derive(Debug, Deserialize)]
struct GmailThread {
    id: String,
    messages: Option<Vec<GmailMessage>>,
}

/// Gmail API message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    thread_id: String,
    payload: Option<GmailMessagePayload>,
    internal_date: Option<String>,
}

/// Gmail message payload (headers and body parts).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessagePayload {
    headers: Option<Vec<GmailHeader>>,
    parts: Option<Vec<GmailPart>>,
    body: Option<GmailBody>,
    mime_type: Option<String>,
}

/// Gmail message header.
#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

/// Gmail message part (for multipart messages).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    mime_type: Option<String>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

/// Gmail message body.
#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

/// OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OAuth credentials stored in keychain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailCredentials {
    /// OAuth refresh token.
    pub refresh_token: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Gmail API provider.
///
/// Implements [`MailboxProvider`] using the Gmail REST API with OAuth 2.0 authentication.
///
/// # Example
///
/// ```ignore
/// use unsubscriber::providers::email::{GmailProvider, MailboxProvider};
///
/// let mut provider = GmailProvider::new(account_id, KeychainAccess::new());
/// provider.authenticate().await?;
///
/// let threads = provider.search("unsubscribe").await?;
/// ```
pub struct GmailProvider {
    /// Account ID for keychain credential lookup.
    account_id: AccountId,
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// Keychain holding the OAuth credentials.
    keychain: KeychainAccess,
    /// OAuth credentials.
    credentials: Option<GmailCredentials>,
    /// Current OAuth access token.
    access_token: Option<String>,
    /// Whether the provider is authenticated.
    authenticated: bool,
}

impl GmailProvider {
    /// Creates a new Gmail provider for the specified account.
    ///
    /// Credentials are read from `keychain` when
    /// [`authenticate`](MailboxProvider::authenticate) is called.
    pub fn new(account_id: AccountId, keychain: KeychainAccess) -> Self {
        Self {
            account_id,
            client: reqwest::Client::new(),
            keychain,
            credentials: None,
            access_token: None,
            authenticated: false,
        }
    }

    /// Creates a new Gmail provider with explicit credentials.
    pub fn with_credentials(account_id: AccountId, credentials: GmailCredentials) -> Self {
        Self {
            account_id,
            client: reqwest::Client::new(),
            keychain: KeychainAccess::new(),
            credentials: Some(credentials),
            access_token: None,
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

    /// Loads credentials from the system keychain.
    async fn load_credentials_from_keychain(&self) -> Result<GmailCredentials> {
        let key = KeychainAccess::gmail_credentials_key(&self.account_id.0);
        let creds_json = self
            .keychain
            .require(&key)
            .await
            .map_err(|e| ProviderError::Authentication(format!("no credentials found: {}", e)))?;

        serde_json::from_str(&creds_json)
            .map_err(|e| ProviderError::Authentication(format!("invalid credentials: {}", e)))
    }

    /// Exchanges the refresh token for a fresh access token.
    async fn refresh_access_token(&mut self) -> Result<String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("no credentials available".to_string()))?;

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse token response: {}", e)))?;

        self.access_token = Some(token_response.access_token.clone());
        Ok(token_response.access_token)
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("not authenticated".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", GMAIL_API_BASE, endpoint);
        let headers = self.auth_headers()?;

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handles API response, checking for errors.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    /// Handles API error responses.
    async fn handle_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => ProviderError::Authentication(format!("unauthorized: {}", body)),
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited { retry_after_secs },
            _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
        }
    }

    /// Builds the query string for one page of a thread search.
    fn search_params(query: &str, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", SEARCH_PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        params
    }

    /// Parses an email address from a header value like "Name <email@example.com>".
    ///
    /// The address is the last `<...>` pair, so a display name may itself
    /// contain `<` or `>`. Without a closed pair the whole value is the address.
    fn parse_address(value: &str) -> Address {
        let value = value.trim();
        let bracketed = value
            .rfind('<')
            .and_then(|start| value[start..].find('>').map(|len| (start, start + len)));

        match bracketed {
            Some((start, end)) => {
                let email = value[start + 1..end].trim();
                let name = value[..start].trim().trim_matches('"').trim();
                if name.is_empty() {
                    Address::new(email)
                } else {
                    Address::with_name(email, name)
                }
            }
            None => Address::new(value),
        }
    }

    /// Decodes a base64url body payload.
    ///
    /// Gmail is inconsistent about padding, so trailing `=` is stripped before
    /// decoding. Invalid UTF-8 is replaced rather than rejected.
    fn decode_body_data(data: &str) -> Option<String> {
        BASE64_URL_SAFE_NO_PAD
            .decode(data.trim_end_matches('='))
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Extracts the plain text and HTML bodies from a Gmail message.
    fn extract_body(payload: &GmailMessagePayload) -> (Option<String>, Option<String>) {
        let mut text = None;
        let mut html = None;

        // Single-part messages carry the body directly on the payload
        if let Some(decoded) = payload
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .and_then(Self::decode_body_data)
        {
            if payload.mime_type.as_deref() == Some("text/html") {
                html = Some(decoded);
            } else {
                text = Some(decoded);
            }
        }

        if let Some(parts) = &payload.parts {
            Self::extract_body_from_parts(parts, &mut text, &mut html);
        }

        (text, html)
    }

    /// Recursively extracts the first text and HTML parts.
    fn extract_body_from_parts(
        parts: &[GmailPart],
        text: &mut Option<String>,
        html: &mut Option<String>,
    ) {
        for part in parts {
            let slot = match part.mime_type.as_deref().unwrap_or("") {
                "text/plain" if text.is_none() => Some(&mut *text),
                "text/html" if html.is_none() => Some(&mut *html),
                _ => None,
            };

            if let Some(slot) = slot {
                *slot = part
                    .body
                    .as_ref()
                    .and_then(|b| b.data.as_deref())
                    .and_then(Self::decode_body_data);
            }

            if let Some(nested) = &part.parts {
                Self::extract_body_from_parts(nested, text, html);
            }
        }
    }

    /// Converts a Gmail message to our domain Email type.
    fn gmail_message_to_email(msg: &GmailMessage) -> Email {
        let payload = msg.payload.as_ref();
        let headers = payload.and_then(|p| p.headers.as_ref());

        let get_header = |name: &str| -> Option<String> {
            headers.and_then(|h| {
                h.iter()
                    .find(|hdr| hdr.name.eq_ignore_ascii_case(name))
                    .map(|hdr| hdr.value.clone())
            })
        };

        let from = get_header("From")
            .map(|v| Self::parse_address(&v))
            .unwrap_or_else(|| Address::new("unknown@unknown.com"));

        let date = msg
            .internal_date
            .as_ref()
            .and_then(|d| d.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        let (body_text, body_html) = payload.map(Self::extract_body).unwrap_or((None, None));

        Email {
            id: EmailId::from(msg.id.clone()),
            thread_id: ThreadId::from(msg.thread_id.clone()),
            from,
            subject: get_header("Subject"),
            body_text,
            body_html,
            date,
        }
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if !self.authenticated {
            return Err(ProviderError::Authentication(
                "not authenticated".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MailboxProvider for GmailProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Gmail
    }

    async fn authenticate(&mut self) -> Result<()> {
        if self.credentials.is_none() {
            self.credentials = Some(self.load_credentials_from_keychain().await?);
        }

        self.refresh_access_token().await?;
        self.authenticated = true;

        tracing::info!(account_id = %self.account_id, "Gmail provider authenticated");
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<ThreadSummary>> {
        self.ensure_authenticated()?;

        let mut summaries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let params = Self::search_params(query, page_token.as_deref());
            let response: ThreadListResponse = self.get("/threads", &params).await?;

            summaries.extend(
                response
                    .threads
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| ThreadSummary {
                        id: ThreadId::from(t.id),
                        snippet: t.snippet.unwrap_or_default(),
                    }),
            );

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(query, threads = summaries.len(), "Gmail search complete");
        Ok(summaries)
    }

    async fn fetch_thread(&self, thread_id: &ThreadId) -> Result<Thread> {
        self.ensure_authenticated()?;

        let endpoint = format!("/threads/{}", thread_id);
        let response: GmailThread = self
            .get(&endpoint, &[("format", "full".to_string())])
            .await?;

        let messages: Vec<Email> = response
            .messages
            .unwrap_or_default()
            .iter()
            .map(Self::gmail_message_to_email)
            .collect();

        Ok(Thread {
            id: ThreadId::from(response.id),
            subject: messages.first().and_then(|m| m.subject.clone()),
            messages,
        })
    }
}
