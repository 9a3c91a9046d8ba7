// Position bookkeeping and the per-tick trading cycle
pub mod cycle;
pub mod ledger;

pub use cycle::{CycleOutcome, CycleSettings, CycleStage, TradingCycle};
pub use ledger::PositionLedger;
