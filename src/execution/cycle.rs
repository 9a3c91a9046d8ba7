use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::PositionLedger;
use crate::api::{MarketData, OrderGateway};
use crate::models::{closing_prices, Decision, IndicatorReading, OrderSide};
use crate::strategy::Strategy;

/// Per-cycle parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub symbol: String,
    /// Candle bar interval, e.g. "15m"
    pub interval: String,
    /// Number of candles fetched per cycle
    pub candle_limit: usize,
    /// Fixed order size in base units
    pub order_quantity: f64,
}

impl CycleSettings {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: "15m".to_string(),
            candle_limit: 100,
            order_quantity: 0.001,
        }
    }
}

/// State where a cycle stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetching,
    Evaluating,
    Deciding,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStage::Fetching => "fetching",
            CycleStage::Evaluating => "evaluating",
            CycleStage::Deciding => "deciding",
        };
        f.write_str(name)
    }
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No entry or exit condition held
    Waited,
    /// Order filled, recorded, and position updated
    Filled {
        side: OrderSide,
        price: f64,
        quantity: f64,
    },
    /// Nothing was sent to the exchange
    Aborted { stage: CycleStage, reason: String },
    /// The exchange refused the order or could not be reached
    OrderRejected { side: OrderSide, reason: String },
    /// The order filled but the ledger could not be brought up to date
    BookkeepingFailed { side: OrderSide, reason: String },
}

/// One decision pass: fetch, evaluate, decide, execute
///
/// Holds no decision state between cycles. `display_open` is refreshed from
/// the ledger each cycle and only used for logging.
pub struct TradingCycle {
    settings: CycleSettings,
    strategy: Box<dyn Strategy>,
    market: Arc<dyn MarketData>,
    gateway: Arc<dyn OrderGateway>,
    ledger: PositionLedger,
    display_open: bool,
}

impl TradingCycle {
    /// Build the controller and seed the display flag from the ledger
    pub async fn new(
        settings: CycleSettings,
        strategy: Box<dyn Strategy>,
        market: Arc<dyn MarketData>,
        gateway: Arc<dyn OrderGateway>,
        ledger: PositionLedger,
    ) -> Self {
        let display_open = match ledger.get_position(&settings.symbol).await {
            Ok(open) => open,
            Err(e) => {
                tracing::warn!(
                    "Failed to load position status for {}: {}",
                    settings.symbol,
                    e
                );
                false
            }
        };

        tracing::info!(
            "Trading {} with {} (position open: {})",
            settings.symbol,
            strategy.name(),
            display_open
        );

        Self {
            settings,
            strategy,
            market,
            gateway,
            ledger,
            display_open,
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Last known position state, for display only
    pub fn display_open(&self) -> bool {
        self.display_open
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Run one cycle; every failure is logged and reported in the outcome
    pub async fn run_once(&mut self) -> CycleOutcome {
        let symbol = self.settings.symbol.clone();

        // Fetching
        let candles = match self
            .market
            .fetch_candles(&symbol, &self.settings.interval, self.settings.candle_limit)
            .await
        {
            Ok(candles) => candles,
            Err(e) => return self.abort(CycleStage::Fetching, e.to_string()),
        };

        let prices = closing_prices(&candles);
        let last_price = match prices.last() {
            Some(&price) => price,
            None => return self.abort(CycleStage::Fetching, "no candles returned".to_string()),
        };

        // Evaluating
        let reading = match self.strategy.readings(&prices) {
            Ok(reading) => reading,
            Err(e) => return self.abort(CycleStage::Evaluating, e.to_string()),
        };
        self.log_readings(last_price, &reading);

        // Deciding
        let is_open = match self.ledger.get_position(&symbol).await {
            Ok(open) => open,
            Err(e) => {
                return self.abort(
                    CycleStage::Deciding,
                    format!("position unknown, skipping decision: {}", e),
                )
            }
        };
        self.display_open = is_open;

        let decision = match self.decide(&prices, is_open) {
            Ok(decision) => decision,
            Err(e) => return self.abort(CycleStage::Deciding, e.to_string()),
        };

        match decision.side() {
            Some(side) => self.execute(side, last_price).await,
            None => {
                tracing::info!("⏳ Waiting for opportunities...");
                CycleOutcome::Waited
            }
        }
    }

    /// Enter only when flat, exit only when holding
    fn decide(&self, prices: &[f64], is_open: bool) -> crate::Result<Decision> {
        if !is_open && self.strategy.should_enter(prices)? {
            tracing::info!("📉 Entry signal for {}, buying", self.settings.symbol);
            return Ok(Decision::Buy);
        }
        if is_open && self.strategy.should_exit(prices)? {
            tracing::info!("📈 Exit signal for {}, selling", self.settings.symbol);
            return Ok(Decision::Sell);
        }
        Ok(Decision::Wait)
    }

    async fn execute(&mut self, side: OrderSide, price: f64) -> CycleOutcome {
        let symbol = self.settings.symbol.clone();
        let quantity = self.settings.order_quantity;
        let client_order_id = Uuid::new_v4();

        // Executing
        if let Err(e) = self
            .gateway
            .submit_market_order(&symbol, side, quantity, client_order_id)
            .await
        {
            tracing::error!(
                symbol = %symbol,
                side = %side,
                price,
                quantity,
                at = %Utc::now(),
                "✗ Order failed: {}",
                e
            );
            return CycleOutcome::OrderRejected {
                side,
                reason: e.to_string(),
            };
        }

        tracing::info!(
            "✓ {} {} {} @ {:.4} filled",
            side,
            quantity,
            symbol,
            price
        );

        let mut failures = Vec::new();

        if let Err(e) = self
            .ledger
            .record_order(&symbol, side, quantity, price, Some(client_order_id))
            .await
        {
            failures.push(format!("order not recorded: {}", e));
        }

        // Attempted even when the order write failed, so the next cycle does not repeat the trade
        match self
            .ledger
            .update_position(&symbol, side.opens_position())
            .await
        {
            Ok(()) => self.display_open = side.opens_position(),
            Err(e) => failures.push(format!("position not updated: {}", e)),
        }

        if failures.is_empty() {
            return CycleOutcome::Filled {
                side,
                price,
                quantity,
            };
        }

        let reason = failures.join("; ");
        tracing::error!(
            symbol = %symbol,
            side = %side,
            price,
            quantity,
            client_order_id = %client_order_id,
            at = %Utc::now(),
            "⚠️  Order filled on exchange but ledger is out of sync, reconcile manually: {}",
            reason
        );

        CycleOutcome::BookkeepingFailed { side, reason }
    }

    fn abort(&self, stage: CycleStage, reason: String) -> CycleOutcome {
        tracing::error!(
            symbol = %self.settings.symbol,
            stage = %stage,
            "Cycle aborted while {}: {}",
            stage,
            reason
        );
        CycleOutcome::Aborted { stage, reason }
    }

    fn log_readings(&self, last_price: f64, reading: &IndicatorReading) {
        if reading.rsi.is_nan() {
            tracing::warn!(
                "RSI is undefined for {} (no gains or losses in window)",
                self.settings.symbol
            );
        }

        match reading.moving_average {
            Some(sma) => tracing::info!(
                "📊 {} | Last: {:.2} | RSI: {:.2} | SMA: {:.2} | Open: {}",
                self.settings.symbol,
                last_price,
                reading.rsi,
                sma,
                self.display_open
            ),
            None => tracing::info!(
                "📊 {} | Last: {:.2} | RSI: {:.2} | Open: {}",
                self.settings.symbol,
                last_price,
                reading.rsi,
                self.display_open
            ),
        }
    }
}
