use anyhow::Context;
use clap::Parser;
use rsitrader::api::{BinanceClient, Credentials};
use rsitrader::config::BotConfig;
use rsitrader::db::PostgresPersistence;
use rsitrader::execution::{CycleOutcome, PositionLedger, TradingCycle};
use rsitrader::strategy::build_strategy;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rsitrader")]
#[command(about = "Polls candles, evaluates RSI signals, and trades one symbol")]
struct Cli {
    /// Load variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).is_ok(),
        None => dotenvy::dotenv().is_ok(),
    };
    setup_logging();

    if !env_loaded {
        tracing::warn!(".env file not found, using environment variables");
    }

    tracing::info!("🚀 rsitrader starting");

    let config = BotConfig::from_env().context("invalid configuration")?;

    let store = Arc::new(
        PostgresPersistence::new(&config.database_url)
            .await
            .context("failed to connect to Postgres")?,
    );

    let client = Arc::new(
        BinanceClient::new(&config.api_url)
            .context("failed to build HTTP client")?
            .with_credentials(Credentials {
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
            }),
    );

    let strategy = build_strategy(config.strategy, config.strategy_config());

    tracing::info!("\n📊 Configuration:");
    tracing::info!("  API URL: {}", config.api_url);
    tracing::info!("  Symbol: {}", config.symbol);
    tracing::info!("  Strategy: {}", strategy.name());
    tracing::info!("  RSI Period: {}", config.period);
    tracing::info!(
        "  Levels: oversold < {} / overbought > {}",
        config.oversold_level,
        config.overbought_level
    );
    tracing::info!(
        "  Candles: {} x {}",
        config.candle_limit,
        config.candle_interval
    );
    tracing::info!("  Order Quantity: {}", config.order_quantity);

    let mut cycle = TradingCycle::new(
        config.cycle_settings(),
        strategy,
        client.clone(),
        client,
        PositionLedger::new(store.clone()),
    )
    .await;

    if cli.once {
        let outcome = cycle.run_once().await;
        log_outcome(&outcome);
        store.close().await;
        return Ok(());
    }

    tracing::info!(
        "💹 Trading every {}s. Press Ctrl+C to stop...",
        config.poll_interval_secs
    );

    run_scheduler(
        &mut cycle,
        Duration::from_secs(config.poll_interval_secs),
        tokio::signal::ctrl_c(),
    )
    .await;

    store.close().await;
    tracing::info!("👋 rsitrader stopped");
    Ok(())
}

/// Run a cycle on every tick until `shutdown` completes
///
/// `shutdown` is polled across loop turns, so a signal that arrives while a
/// cycle is running stops the loop at the next select.
async fn run_scheduler<F>(cycle: &mut TradingCycle, every: Duration, shutdown: F)
where
    F: Future,
{
    // First tick fires immediately
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = ticker.tick() => {
                let outcome = cycle.run_once().await;
                log_outcome(&outcome);
            }
        }
    }
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rsitrader=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Filled {
            side,
            price,
            quantity,
        } => tracing::info!("Cycle done: {} {} @ {:.4}", side, quantity, price),
        CycleOutcome::Waited => tracing::debug!("Cycle done: no action"),
        other => tracing::warn!("Cycle done with problems: {:?}", other),
    }
}
