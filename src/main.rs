//! OnchainID KYC Tracker — Entry Point
//!
//! Initializes configuration, logging and chain connections, then
//! drives the onboarding session for the configured wallet. Runs until
//! SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load the wallet key from env (WALLET_PRIVATE_KEY)
//! 4. Connect the RPC provider and validate factory/gateway code
//! 5. Create the OnchainID adapter, signing client and latch store
//! 6. Connect the wallet session (latches + first refresh)
//! 7. Spawn the poller, the health monitor and the HTTP server
//! 8. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use onchain_kyc_tracker::adapters::chain::contracts::ContractAddresses;
use onchain_kyc_tracker::adapters::chain::{ContractValidator, EvmProvider, OnchainIdContracts};
use onchain_kyc_tracker::adapters::http;
use onchain_kyc_tracker::adapters::metrics::{HealthState, TrackerMetrics};
use onchain_kyc_tracker::adapters::persistence::FileLatchStore;
use onchain_kyc_tracker::adapters::signing::{SigningClient, SigningClientConfig};
use onchain_kyc_tracker::config;
use onchain_kyc_tracker::ports::chain_client::IdentityChain;
use onchain_kyc_tracker::ports::latch_store::LatchStore;
use onchain_kyc_tracker::usecases::OnboardingSession;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.service.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        chain_id = config.chain.chain_id,
        auto_advance = config.service.auto_advance,
        "Starting OnchainID KYC tracker"
    );

    // ── 3. Shutdown channel ─────────────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Wallet key from env (never from config) ──────────
    let private_key = std::env::var("WALLET_PRIVATE_KEY")
        .context("WALLET_PRIVATE_KEY must be set")?;

    // ── 5. RPC provider + contract validation ───────────────
    let provider = Arc::new(
        EvmProvider::connect(&config.chain, &private_key)
            .await
            .context("Failed to connect to RPC")?,
    );
    drop(private_key);

    ContractValidator::new(provider.inner())
        .validate_all(&config.chain)
        .await
        .context("Contract validation failed")?;

    // ── 6. Adapters ─────────────────────────────────────────
    let chain = Arc::new(OnchainIdContracts::new(
        Arc::clone(&provider),
        ContractAddresses {
            identity_factory: config.chain.identity_factory,
            identity_gateway: config.chain.identity_gateway,
        },
    ));
    let signer = Arc::new(
        SigningClient::new(SigningClientConfig {
            base_url: config.signing.base_url.clone(),
            timeout: config.signing.timeout(),
        })
        .context("Failed to create signing client")?,
    );
    let latches = Arc::new(
        FileLatchStore::new(&config.persistence.data_dir)
            .await
            .context("Failed to open latch store")?,
    );
    let metrics = Arc::new(TrackerMetrics::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());

    // ── 7. Wallet session ───────────────────────────────────
    let session = Arc::new(OnboardingSession::new(
        Arc::clone(&chain),
        signer,
        Arc::clone(&latches),
        &config,
        Arc::clone(&metrics),
    ));
    let snapshot = session.connect(provider.wallet()).await;
    info!(
        wallet = %provider.wallet(),
        stage = %snapshot.stage,
        percent = snapshot.percent,
        "Session initialized"
    );

    // ── 8. Poller ───────────────────────────────────────────
    let poll_shutdown = shutdown_tx.subscribe();
    let poll_session = Arc::clone(&session);
    let poll_interval = config.service.poll_interval();
    let auto_advance = config.service.auto_advance;
    let poll_handle = tokio::spawn(async move {
        poll_session
            .run(poll_shutdown, poll_interval, auto_advance)
            .await;
    });

    // ── 9. Health monitor ───────────────────────────────────
    let monitor_shutdown = shutdown_tx.subscribe();
    let monitor_handle = tokio::spawn(monitor_health(
        Arc::clone(&chain),
        Arc::clone(&latches),
        Arc::clone(&health),
        monitor_shutdown,
    ));

    // ── 10. HTTP server ─────────────────────────────────────
    let app = http::router(Arc::clone(&session), Arc::clone(&health), metrics);
    let bind_address = config.service.bind_address.clone();
    let server_shutdown = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = http::serve(&bind_address, app, server_shutdown).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    info!("All tasks spawned — tracker is running");

    // ── 11. Wait for SIGINT ─────────────────────────────────
    signal::ctrl_c()
        .await
        .context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // 1. Readiness probe → 503
    health.running.store(false, Ordering::Relaxed);

    // 2. Signal all tasks to stop
    let _ = shutdown_tx.send(());

    // 3. Let an in-flight action finish its current step (up to 30s)
    if tokio::time::timeout(Duration::from_secs(30), poll_handle)
        .await
        .is_err()
    {
        warn!("Poller did not stop within 30s");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), server_handle).await;
    monitor_handle.abort();

    let snapshot = session.snapshot();
    info!(stage = %snapshot.stage, percent = snapshot.percent, "Shutdown complete");
    Ok(())
}

/// Refresh readiness from the RPC and latch store health checks.
async fn monitor_health<C: IdentityChain, L: LatchStore>(
    chain: Arc<C>,
    latches: Arc<L>,
    health: Arc<HealthState>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                let chain_ok = chain.is_healthy().await;
                let store_ok = latches.is_healthy().await;
                if !chain_ok {
                    warn!("RPC health check failed");
                }
                if !store_ok {
                    warn!("Latch store health check failed");
                }
                health.chain_healthy.store(chain_ok, Ordering::Relaxed);
                health.store_healthy.store(store_ok, Ordering::Relaxed);
            }
        }
    }
}
