// Technical indicators module
// Pure functions over closing prices, oldest first

pub mod moving_average;
pub mod rsi;

pub use moving_average::calculate_sma;
pub use rsi::calculate_rsi;
