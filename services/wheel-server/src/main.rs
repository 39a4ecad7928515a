//! Fortune wheel service: periodically draws a weighted-random winner among
//! token holders, claims creator fees, and routes a share to the winner
//! through disposable hop accounts, streaming live state to connected
//! clients.

use std::sync::Arc;

use anyhow::{Context, Result};
use solana_sdk::signer::Signer;
use tracing::{info, warn};

use fortune_wheel_common::HistoryLedger;
use fortune_wheel_server::api;
use fortune_wheel_server::config::WheelConfig;
use fortune_wheel_server::coordinator;
use fortune_wheel_server::persist::LedgerStore;
use fortune_wheel_server::providers::{DasHolderProvider, RpcChainClient, WebhookNotifier};
use fortune_wheel_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = WheelConfig::from_env().context("failed to load configuration")?;
    info!(
        token_mint = %config.token_mint,
        spin_interval_secs = config.spin_interval.as_secs(),
        holder_refresh_secs = config.holder_refresh_interval.as_secs(),
        "fortune wheel starting"
    );
    match &config.operator_keypair {
        Some(keypair) => info!(operator = %keypair.pubkey(), "operator key loaded"),
        None => warn!("no operator key configured, distribution is disabled for this process"),
    }

    let store = LedgerStore::new(config.data_file.clone());
    let baseline = config.cumulative_baseline_lamports;
    let ledger = match store.load() {
        Some(snapshot) => {
            info!(records = snapshot.records.len(), "ledger restored from snapshot");
            HistoryLedger::from_snapshot(snapshot, baseline)
        }
        None => HistoryLedger::new(baseline),
    };

    let holders = Arc::new(DasHolderProvider::new(
        config.holder_api_url.clone(),
        config.request_timeout,
    )?);
    let chain = Arc::new(RpcChainClient::new(
        &config.rpc_url,
        &config.claim_api_url,
        config.request_timeout,
    )?);
    let notifier = Arc::new(WebhookNotifier::new(
        config.webhook_url.clone(),
        config.request_timeout,
    ));

    let bind_addr = config.bind_addr;
    let state = AppState::new(config, ledger, store, holders, chain, notifier);

    coordinator::refresh_balance(&state).await;

    tokio::spawn(coordinator::holder_refresh_loop(Arc::clone(&state)));
    tokio::spawn(coordinator::auto_spin_loop(Arc::clone(&state)));
    tokio::spawn(coordinator::countdown_loop(Arc::clone(&state)));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
