//! Unsubscribe orchestration.
//!
//! Ties a [`MailboxProvider`] and an [`HttpFetcher`] together:
//!
//! 1. Search the mailbox for the keyword.
//! 2. Fetch each matching thread and extract links from every message body.
//! 3. Log how many links were found.
//! 4. Send a GET to each link and record the outcome.
//!
//! Mailbox errors abort the run before anything is dispatched. HTTP errors
//! are recorded per link and never stop the loop.

use thiserror::Error;

use super::LinkExtractor;
use crate::config::SearchSettings;
use crate::domain::{Link, LinkCollection};
use crate::providers::email::{MailboxProvider, ProviderError};
use crate::providers::http::HttpFetcher;

/// Errors that abort an unsubscribe run.
#[derive(Debug, Error)]
pub enum UnsubscribeError {
    /// Searching the mailbox or reading a thread failed.
    #[error("mailbox error: {0}")]
    Provider(#[from] ProviderError),

    /// The configured link pattern is not a valid regular expression.
    #[error("invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for unsubscribe operations.
pub type UnsubscribeResult<T> = Result<T, UnsubscribeError>;

/// What happened when a single link was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The link answered 200 OK.
    Success,
    /// The link answered with some other status.
    Failure {
        /// HTTP status code received.
        status: u16,
    },
    /// No response was received.
    Error {
        /// Transport error description.
        message: String,
    },
}

impl DispatchOutcome {
    /// Returns true for [`DispatchOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A link paired with its dispatch outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    /// The link that was requested.
    pub link: Link,
    /// What happened.
    pub outcome: DispatchOutcome,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of links extracted (after dedupe, if enabled).
    pub links_found: usize,
    /// One entry per dispatched link, in dispatch order.
    pub outcomes: Vec<LinkOutcome>,
}

impl RunSummary {
    /// Number of links that answered 200.
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Success))
    }

    /// Number of links that answered with a non-200 status.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Failure { .. }))
    }

    /// Number of links that produced no response.
    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Error { .. }))
    }

    fn count(&self, pred: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }
}

/// Finds unsubscribe links in a mailbox and requests each one.
pub struct UnsubscribeService<M: MailboxProvider, H: HttpFetcher> {
    mailbox: M,
    fetcher: H,
    extractor: LinkExtractor,
    keyword: String,
    dedupe: bool,
}

impl<M: MailboxProvider, H: HttpFetcher> UnsubscribeService<M, H> {
    /// Creates a new service searching for `keyword`.
    ///
    /// Links are not deduplicated; see [`Self::with_dedupe`].
    pub fn new(
        mailbox: M,
        fetcher: H,
        extractor: LinkExtractor,
        keyword: impl Into<String>,
    ) -> Self {
        Self {
            mailbox,
            fetcher,
            extractor,
            keyword: keyword.into(),
            dedupe: false,
        }
    }

    /// Creates a service from search settings.
    ///
    /// # Errors
    ///
    /// Returns [`UnsubscribeError::Pattern`] if `link_pattern` does not compile.
    pub fn from_settings(
        mailbox: M,
        fetcher: H,
        settings: &SearchSettings,
    ) -> UnsubscribeResult<Self> {
        let extractor = LinkExtractor::new(&settings.link_pattern)?;
        Ok(Self::new(mailbox, fetcher, extractor, settings.keyword.clone())
            .with_dedupe(settings.dedupe_links))
    }

    /// Drops repeated links before dispatch, keeping the first occurrence.
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// Returns the search keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns the mailbox provider.
    pub fn mailbox(&self) -> &M {
        &self.mailbox
    }

    /// Searches the mailbox and extracts links from every matching message.
    ///
    /// No requests are sent.
    ///
    /// # Errors
    ///
    /// Returns [`UnsubscribeError::Provider`] if the search or any thread
    /// fetch fails. Nothing collected so far is returned in that case.
    pub async fn collect_links(&self) -> UnsubscribeResult<LinkCollection> {
        let summaries = self.mailbox.search(&self.keyword).await?;
        tracing::debug!(
            keyword = %self.keyword,
            threads = summaries.len(),
            "mailbox search complete"
        );

        let mut links = LinkCollection::new();
        for summary in &summaries {
            let thread = self.mailbox.fetch_thread(&summary.id).await?;
            for message in thread.messages() {
                let before = links.len();
                self.extractor.extract_into(message.body(), &mut links);
                tracing::trace!(
                    thread_id = %thread.id,
                    email_id = %message.id,
                    from = %message.from.display(),
                    links = links.len() - before,
                    "scanned message"
                );
            }
        }

        if self.dedupe {
            let before = links.len();
            links.dedupe();
            tracing::debug!(removed = before - links.len(), "deduplicated links");
        }

        Ok(links)
    }

    /// Requests one link and classifies the result.
    ///
    /// Never fails: transport errors become [`DispatchOutcome::Error`].
    pub async fn dispatch(&self, link: &Link) -> DispatchOutcome {
        tracing::debug!(link = %link, host = ?link.host(), "requesting");
        match self.fetcher.fetch(link.as_str()).await {
            Ok(response) if response.is_ok() => {
                tracing::info!(link = %link, "Successfully unsubscribed from: {}", link);
                DispatchOutcome::Success
            }
            Ok(response) => {
                tracing::warn!(
                    link = %link,
                    status = response.status,
                    "Failed to unsubscribe from: {}",
                    link
                );
                DispatchOutcome::Failure {
                    status: response.status,
                }
            }
            Err(e) => {
                tracing::error!(link = %link, error = %e, "Error unsubscribing from: {}", link);
                DispatchOutcome::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Runs the full scan: collect links, report the count, dispatch each.
    ///
    /// Links are requested one at a time, in the order they were found.
    ///
    /// # Errors
    ///
    /// Returns [`UnsubscribeError::Provider`] if the mailbox cannot be
    /// searched or read. Per-link failures are in the summary instead.
    pub async fn run(&self) -> UnsubscribeResult<RunSummary> {
        let links = self.collect_links().await?;
        tracing::info!(count = links.len(), "Found {} unsubscribe links.", links.len());

        let mut summary = RunSummary {
            links_found: links.len(),
            outcomes: Vec::with_capacity(links.len()),
        };

        for link in links {
            let outcome = self.dispatch(&link).await;
            summary.outcomes.push(LinkOutcome { link, outcome });
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Email, EmailId, ProviderType, Thread, ThreadId, ThreadSummary};
    use crate::providers::email;
    use crate::providers::http::{FetchError, FetchResponse, MockHttpFetcher};
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    struct FakeMailbox {
        threads: Vec<Thread>,
        fail_search: bool,
        queries: Mutex<Vec<String>>,
    }

    impl FakeMailbox {
        fn new(threads: Vec<Thread>) -> Self {
            Self {
                threads,
                fail_search: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail_search: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl MailboxProvider for FakeMailbox {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Gmail
        }

        async fn authenticate(&mut self) -> email::Result<()> {
            Ok(())
        }

        async fn search(&self, query: &str) -> email::Result<Vec<ThreadSummary>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail_search {
                return Err(ProviderError::Connection("mailbox unavailable".into()));
            }
            Ok(self
                .threads
                .iter()
                .map(|t| ThreadSummary::new(t.id.clone()))
                .collect())
        }

        async fn fetch_thread(&self, thread_id: &ThreadId) -> email::Result<Thread> {
            self.threads
                .iter()
                .find(|t| &t.id == thread_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(thread_id.to_string()))
        }
    }

    fn message(thread: &str, id: &str, html: &str) -> Email {
        Email {
            id: EmailId::from(id),
            thread_id: ThreadId::from(thread),
            from: Address::new("news@example.com"),
            subject: Some("Weekly digest".to_string()),
            body_text: None,
            body_html: Some(html.to_string()),
            date: Utc::now(),
        }
    }

    fn thread(id: &str, bodies: &[&str]) -> Thread {
        Thread {
            id: ThreadId::from(id),
            subject: Some("Weekly digest".to_string()),
            messages: bodies
                .iter()
                .enumerate()
                .map(|(i, body)| message(id, &format!("{id}-{i}"), body))
                .collect(),
        }
    }

    fn service(
        mailbox: FakeMailbox,
        fetcher: MockHttpFetcher,
    ) -> UnsubscribeService<FakeMailbox, MockHttpFetcher> {
        UnsubscribeService::new(mailbox, fetcher, LinkExtractor::default(), "unsubscribe")
    }

    fn link_strings(links: &LinkCollection) -> Vec<&str> {
        links.iter().map(Link::as_str).collect()
    }

    #[tokio::test]
    async fn no_threads_no_requests() {
        let service = service(FakeMailbox::new(Vec::new()), MockHttpFetcher::new());

        let summary = service.run().await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(*service.mailbox().queries.lock().unwrap(), vec!["unsubscribe"]);
    }

    #[tokio::test]
    async fn collects_links_across_threads_in_order() {
        let mailbox = FakeMailbox::new(vec![
            thread(
                "t1",
                &[
                    "click http://example.com/unsubscribe?x=1 now",
                    r#"<a href="https://b.example/Unsubscribe">out</a>"#,
                ],
            ),
            thread("t2", &["no links here", "HTTPS://C.EXAMPLE/UNSUBSCRIBE"]),
        ]);
        let service = service(mailbox, MockHttpFetcher::new());

        let links = service.collect_links().await.unwrap();

        assert_eq!(
            link_strings(&links),
            vec![
                "http://example.com/unsubscribe?x=1",
                "https://b.example/Unsubscribe",
                "HTTPS://C.EXAMPLE/UNSUBSCRIBE",
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_links_are_kept_by_default() {
        let mailbox = FakeMailbox::new(vec![thread(
            "t1",
            &["http://a.example/unsubscribe", "http://a.example/unsubscribe"],
        )]);
        let mut fetcher = MockHttpFetcher::new();
        fetcher
            .expect_fetch()
            .times(2)
            .returning(|_| Ok(FetchResponse::new(200)));
        let service = service(mailbox, fetcher);

        let summary = service.run().await.unwrap();

        assert_eq!(summary.links_found, 2);
        assert_eq!(summary.succeeded(), 2);
    }

    #[tokio::test]
    async fn dedupe_keeps_first_occurrence() {
        let mailbox = FakeMailbox::new(vec![thread(
            "t1",
            &[
                "http://a.example/unsubscribe http://b.example/unsubscribe",
                "http://a.example/unsubscribe",
            ],
        )]);
        let service = service(mailbox, MockHttpFetcher::new()).with_dedupe(true);

        let links = service.collect_links().await.unwrap();

        assert_eq!(
            link_strings(&links),
            vec!["http://a.example/unsubscribe", "http://b.example/unsubscribe"]
        );
    }

    #[tokio::test]
    async fn dispatch_success() {
        let mut fetcher = MockHttpFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(FetchResponse::new(200)));
        let service = service(FakeMailbox::new(Vec::new()), fetcher);

        let outcome = service
            .dispatch(&Link::from("https://a.example/unsubscribe"))
            .await;

        assert_eq!(outcome, DispatchOutcome::Success);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn dispatch_non_200_is_failure() {
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_fetch().returning(|url| {
            if url.contains("gone") {
                Ok(FetchResponse::new(404))
            } else {
                Ok(FetchResponse::new(500))
            }
        });
        let service = service(FakeMailbox::new(Vec::new()), fetcher);

        let gone = service
            .dispatch(&Link::from("https://gone.example/unsubscribe"))
            .await;
        let broken = service
            .dispatch(&Link::from("https://broken.example/unsubscribe"))
            .await;

        assert_eq!(gone, DispatchOutcome::Failure { status: 404 });
        assert_eq!(broken, DispatchOutcome::Failure { status: 500 });
    }

    #[tokio::test]
    async fn dispatch_transport_error() {
        let mut fetcher = MockHttpFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Err(FetchError::Connect("dns error".to_string())));
        let service = service(FakeMailbox::new(Vec::new()), fetcher);

        let outcome = service
            .dispatch(&Link::from("https://nowhere.invalid/unsubscribe"))
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Error {
                message: "connection failed: dns error".to_string()
            }
        );
    }

    #[tokio::test]
    async fn error_on_one_link_does_not_stop_the_rest() {
        let mailbox = FakeMailbox::new(vec![thread(
            "t1",
            &[
                "http://one.example/unsubscribe",
                "http://two.example/unsubscribe",
                "http://three.example/unsubscribe",
            ],
        )]);

        let requested = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requested);
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_fetch().times(3).returning(move |url| {
            log.lock().unwrap().push(url.to_string());
            if url.contains("two") {
                Err(FetchError::Timeout("timed out".to_string()))
            } else if url.contains("three") {
                Ok(FetchResponse::new(404))
            } else {
                Ok(FetchResponse::new(200))
            }
        });
        let service = service(mailbox, fetcher);

        let summary = service.run().await.unwrap();

        assert_eq!(
            *requested.lock().unwrap(),
            vec![
                "http://one.example/unsubscribe",
                "http://two.example/unsubscribe",
                "http://three.example/unsubscribe",
            ]
        );
        assert_eq!(summary.links_found, 3);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.errored(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.outcomes[0].link, Link::from("http://one.example/unsubscribe"));
        assert!(matches!(
            summary.outcomes[1].outcome,
            DispatchOutcome::Error { .. }
        ));
        assert_eq!(
            summary.outcomes[2].outcome,
            DispatchOutcome::Failure { status: 404 }
        );
    }

    #[tokio::test]
    async fn search_error_aborts_before_dispatch() {
        let service = service(FakeMailbox::failing(), MockHttpFetcher::new());

        let result = service.run().await;

        assert!(matches!(
            result,
            Err(UnsubscribeError::Provider(ProviderError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn missing_thread_aborts_collection() {
        struct VanishingMailbox;

        #[async_trait]
        impl MailboxProvider for VanishingMailbox {
            fn provider_type(&self) -> ProviderType {
                ProviderType::Imap
            }

            async fn authenticate(&mut self) -> email::Result<()> {
                Ok(())
            }

            async fn search(&self, _query: &str) -> email::Result<Vec<ThreadSummary>> {
                Ok(vec![ThreadSummary::new("INBOX:7")])
            }

            async fn fetch_thread(&self, thread_id: &ThreadId) -> email::Result<Thread> {
                Err(ProviderError::NotFound(thread_id.to_string()))
            }
        }

        let service = UnsubscribeService::new(
            VanishingMailbox,
            MockHttpFetcher::new(),
            LinkExtractor::default(),
            "unsubscribe",
        );

        let result = service.run().await;
        assert!(matches!(
            result,
            Err(UnsubscribeError::Provider(ProviderError::NotFound(_)))
        ));
    }

    #[test]
    fn from_settings_uses_keyword_and_dedupe() {
        let settings = SearchSettings {
            keyword: "opt out".to_string(),
            dedupe_links: true,
            ..SearchSettings::default()
        };

        let service = UnsubscribeService::from_settings(
            FakeMailbox::new(Vec::new()),
            MockHttpFetcher::new(),
            &settings,
        )
        .unwrap();

        assert_eq!(service.keyword(), "opt out");
        assert!(service.dedupe);
    }

    #[test]
    fn from_settings_rejects_bad_pattern() {
        let settings = SearchSettings {
            link_pattern: "(unclosed".to_string(),
            ..SearchSettings::default()
        };

        let result = UnsubscribeService::from_settings(
            FakeMailbox::new(Vec::new()),
            MockHttpFetcher::new(),
            &settings,
        );

        assert!(matches!(result, Err(UnsubscribeError::Pattern(_))));
    }

    #[test]
    fn summary_counts() {
        let summary = RunSummary {
            links_found: 3,
            outcomes: vec![
                LinkOutcome {
                    link: Link::from("http://a/unsubscribe"),
                    outcome: DispatchOutcome::Success,
                },
                LinkOutcome {
                    link: Link::from("http://b/unsubscribe"),
                    outcome: DispatchOutcome::Failure { status: 410 },
                },
                LinkOutcome {
                    link: Link::from("http://c/unsubscribe"),
                    outcome: DispatchOutcome::Success,
                },
            ],
        };

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.errored(), 0);
    }

    /// Shared buffer the fmt layer writes into.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn line_containing(&self, needle: &str) -> String {
            self.lines()
                .into_iter()
                .find(|line| line.contains(needle))
                .unwrap_or_else(|| panic!("no log line contains {needle:?}"))
        }
    }

    #[test]
    fn run_logs_count_and_each_outcome_with_its_link() {
        let mailbox = FakeMailbox::new(vec![thread(
            "t1",
            &[
                "http://one.example/unsubscribe",
                "http://two.example/unsubscribe",
                "http://three.example/unsubscribe",
            ],
        )]);
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_fetch().times(3).returning(|url| {
            if url.contains("two") {
                Err(FetchError::Timeout("timed out".to_string()))
            } else if url.contains("three") {
                Ok(FetchResponse::new(503))
            } else {
                Ok(FetchResponse::new(200))
            }
        });
        let service = service(mailbox, fetcher);

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .finish();

        let summary = tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(service.run())
        })
        .unwrap();
        assert_eq!(summary.links_found, 3);

        let found = logs.line_containing("Found 3 unsubscribe links.");
        assert!(found.contains("INFO"));

        let success =
            logs.line_containing("Successfully unsubscribed from: http://one.example/unsubscribe");
        assert!(success.contains("INFO"));

        let error =
            logs.line_containing("Error unsubscribing from: http://two.example/unsubscribe");
        assert!(error.contains("ERROR"));
        assert!(error.contains("timed out"));

        let failure =
            logs.line_containing("Failed to unsubscribe from: http://three.example/unsubscribe");
        assert!(failure.contains("WARN"));
        assert!(failure.contains("status=503"));
    }
}
