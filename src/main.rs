//! unsubscriber - Entry point for the bulk unsubscribe tool

use anyhow::Context;

use unsubscriber::config::{SearchSettings, Settings};
use unsubscriber::domain::ProviderType;
use unsubscriber::providers::email::{GmailProvider, ImapConfig, ImapProvider, MailboxProvider};
use unsubscriber::providers::http::ReqwestFetcher;
use unsubscriber::storage::KeychainAccess;
use unsubscriber::{RunSummary, UnsubscribeService};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting unsubscriber");

    match run().await {
        Ok(summary) => {
            tracing::info!(
                links = summary.links_found,
                succeeded = summary.succeeded(),
                failed = summary.failed(),
                errored = summary.errored(),
                "Run complete"
            );
        }
        Err(e) => {
            tracing::error!("Run aborted: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<RunSummary> {
    let settings = Settings::load().context("failed to load settings")?;
    let fetcher =
        ReqwestFetcher::from_settings(&settings.http).context("failed to build HTTP client")?;
    let keychain = KeychainAccess::new();
    let account_id = settings.account.id.clone();

    let provider_type = settings.account.provider.provider_type();
    tracing::info!(account_id = %account_id, provider = ?provider_type, "Using account");

    match provider_type {
        ProviderType::Gmail => {
            let provider = GmailProvider::new(account_id, keychain);
            scan(provider, fetcher, &settings.search).await
        }
        ProviderType::Imap => {
            let config = ImapConfig::from_provider_config(&settings.account.provider)
                .context("IMAP account is missing its server settings")?;
            let provider = ImapProvider::new(account_id, config, keychain);
            scan(provider, fetcher, &settings.search).await
        }
    }
}

async fn scan<M: MailboxProvider>(
    mut provider: M,
    fetcher: ReqwestFetcher,
    search: &SearchSettings,
) -> anyhow::Result<RunSummary> {
    provider
        .authenticate()
        .await
        .context("failed to authenticate with mailbox")?;

    let service = UnsubscribeService::from_settings(provider, fetcher, search)?;
    let summary = service.run().await?;
    Ok(summary)
}
