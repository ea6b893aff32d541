use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use configsync::{ConfigManager, ExchangeConfig, RemoteStoreConfig, TradingConfig};

#[derive(Parser, Debug)]
#[command(name = "configsync")]
#[command(about = "Configuration management for a crypto trading engine")]
struct Args {
    /// Path to the trading configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Exchange to resolve credentials for
    #[arg(long, default_value = "binance")]
    exchange: String,

    /// Validate configuration and exit without touching the remote store
    #[arg(long)]
    validate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "configsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    info!("Starting configsync...");

    // Load trading parameters, falling back to built-in defaults
    let trading = if Path::new(&args.config).exists() {
        let config = TradingConfig::load_from_path(&args.config)?;
        info!("Trading configuration loaded from {}", args.config);
        config
    } else {
        warn!("{} not found, using built-in defaults", args.config);
        TradingConfig::default()
    };

    trading.validate()?;
    info!(
        "Trading configuration valid: {} symbols at {} timeframe",
        trading.symbols.len(),
        trading.timeframe
    );
    if trading.live_trading {
        warn!("Live trading enabled - real funds at risk!");
    }

    // Resolve exchange credentials from the environment
    let exchange = ExchangeConfig::new(&args.exchange);
    if exchange.api_key.is_empty() {
        warn!("No API credentials found for exchange '{}'", exchange.name);
    } else {
        info!("Credentials resolved for exchange '{}'", exchange.name);
    }

    if args.validate_only {
        info!("Validation complete");
        return Ok(());
    }

    // Connect to the remote store; failure means local-only mode
    let remote = RemoteStoreConfig::from_env()?;
    let mut manager = ConfigManager::new(remote).await;
    info!(
        remote_connected = manager.is_remote_connected(),
        "Configuration manager ready"
    );

    // Seed the manager with the validated trading parameters
    manager.set("trading", serde_json::to_value(&trading)?).await;
    manager
        .set("exchange_name", serde_json::Value::String(exchange.name.clone()))
        .await;

    if manager.sync_to_remote().await {
        info!("Configuration synced to remote store");
    } else {
        info!("Running in local-only mode, configuration kept in memory");
    }

    Ok(())
}
