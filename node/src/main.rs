// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MGov Dev Node
//!
//! Entry point for the `mgov-node` binary. Parses CLI arguments, initializes
//! logging and metrics, deploys the governance token on a local dev chain,
//! and serves the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the node
//! - `replay`  — execute a scenario file and check its expectations
//! - `keygen`  — generate a signing keypair
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use mgov_contracts::DevChain;
use mgov_protocol::crypto::keys::Keypair;
use mgov_protocol::LedgerConfig;

use cli::{ChainArgs, Commands, MgovNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;
use scenario::Scenario;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = MgovNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Replay(args) => replay(args),
        Commands::Keygen(args) => keygen(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the ledger config from `--config` (or defaults) and applies CLI
/// overrides.
fn load_config(args: &ChainArgs) -> Result<LedgerConfig> {
    let mut config = match &args.config {
        Some(path) => LedgerConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    if let Some(chain_id) = args.chain_id {
        config.chain_id = chain_id;
    }
    config.validate().context("invalid ledger configuration")?;
    Ok(config)
}

/// Starts the node: API server, metrics endpoint, and optional interval
/// mining.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.chain.log_format),
    );

    let config = load_config(&args.chain)?;
    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        chain_id = config.chain_id,
        owner = %args.owner,
        "starting mgov-node"
    );

    // --- Chain ---
    let mut chain = DevChain::new(config, args.owner);
    if args.no_automine {
        chain.set_automine(false);
    }
    tracing::info!(
        name = chain.token().name(),
        verifying_contract = %chain.token().config().verifying_contract,
        domain_separator = %hex::encode(chain.token().domain_separator()),
        "token deployed"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Application state ---
    let app_state = api::AppState::new(
        env!("CARGO_PKG_VERSION"),
        chain,
        Arc::clone(&node_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Interval mining ---
    let miner = args.interval_mining_ms.map(|ms| {
        let state = app_state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(ms));
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                state.mine();
            }
        })
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    if let Some(miner) = miner {
        miner.abort();
    }
    tracing::info!("mgov-node stopped");
    Ok(())
}

/// Replays a scenario file and prints the report as JSON.
fn replay(args: cli::ReplayArgs) -> Result<()> {
    logging::init_logging(
        logging::REPLAY_FILTER,
        LogFormat::from_str_lossy(&args.chain.log_format),
    );

    let config = load_config(&args.chain)?;
    let scenario = Scenario::from_json_file(&args.scenario)?;
    let report = scenario
        .replay(config)
        .with_context(|| format!("scenario {} failed", args.scenario.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Generates a signing keypair and prints its address.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    logging::init_logging(logging::KEYGEN_FILTER, LogFormat::Pretty);

    let keypair = Keypair::generate();
    let secret_hex = hex::encode(keypair.secret_bytes());

    match &args.out {
        Some(path) => {
            std::fs::write(path, &secret_hex)
                .with_context(|| format!("failed to write key to {}", path.display()))?;

            // Restrict permissions on Unix.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }

            tracing::info!(address = %keypair.address(), key_path = %path.display(), "keypair generated");
            println!("Address    : {}", keypair.address());
            println!("Secret key : {}", path.display());
        }
        None => {
            println!("Address    : {}", keypair.address());
            println!("Secret key : 0x{}", secret_hex);
        }
    }

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    let defaults = LedgerConfig::default();
    println!("mgov-node {}", env!("CARGO_PKG_VERSION"));
    println!("token     {} ({})", defaults.name, defaults.symbol);
    println!("chain id  {}", defaults.chain_id);
    println!("rustc     {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
