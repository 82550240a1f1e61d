//! Berbix client walk-through
//!
//! Exercises the client end to end against a configured environment:
//! 1. Creates a transaction for the configured customer
//! 2. Requests a continuation token with the returned credential
//! 3. Revives a credential from the bare refresh token and fetches the
//!    transaction (forcing a refresh)
//! 4. Exchanges BERBIX_DEMO_CODE for tokens, when set

mod config;

use anyhow::{Context, Result};
use berbix_auth::{Client, CreateTransactionOptions, Credential};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let client = build_client(config.berbix, &config.transport)?;
    info!(api_host = client.api_host(), "client ready");

    let opts = CreateTransactionOptions {
        customer_uid: Some(config.demo.customer_uid),
        ..Default::default()
    };
    let mut tokens = client
        .create_transaction(&opts)
        .await
        .context("creating transaction")?;
    info!(
        transaction_id = tokens.transaction_id().unwrap_or_default(),
        has_client_token = tokens.client_token().is_some(),
        "transaction created"
    );

    let continuation = client
        .create_continuation(&mut tokens)
        .await
        .context("creating continuation")?;
    info!(continuation = %continuation, "continuation created");

    let mut revived = Credential::from_refresh(tokens.refresh_token());
    let transaction = client
        .fetch_transaction(&mut revived)
        .await
        .context("fetching transaction with refreshed credential")?;
    info!(transaction = %transaction, "transaction fetched");

    match std::env::var("BERBIX_DEMO_CODE") {
        Ok(code) => {
            let exchanged = client
                .exchange_code(&code)
                .await
                .context("exchanging authorization code")?;
            info!(
                transaction_id = exchanged.transaction_id().unwrap_or_default(),
                "authorization code exchanged"
            );
        }
        Err(_) => info!("BERBIX_DEMO_CODE not set, skipping code exchange"),
    }

    Ok(())
}

fn build_client(
    berbix: config::BerbixConfig,
    transport: &config::TransportSettings,
) -> Result<Client> {
    let mut builder = Client::builder()
        .environment(berbix.environment)
        .transport_config(transport.to_transport_config());
    if let Some(secret) = berbix.api_secret {
        builder = builder.api_secret(secret);
    }
    if let Some(host) = berbix.api_host {
        builder = builder.api_host(host);
    }
    builder.build().context(
        "building Berbix client (set BERBIX_API_SECRET or berbix.api_secret_file)",
    )
}
