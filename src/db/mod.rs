// Durable storage for orders and positions
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{NewOrder, Order, PositionRecord};
use crate::Result;

pub use memory::InMemoryStore;
pub use postgres::PostgresPersistence;

/// Storage behind the position ledger
///
/// Holds at most one position row per symbol and an append-only order log.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Position row for `symbol`, `None` if it was never written
    async fn load_position(&self, symbol: &str) -> Result<Option<PositionRecord>>;

    /// Insert or update the single row for `symbol`, refreshing `updated_at`
    async fn upsert_position(&self, symbol: &str, is_open: bool) -> Result<()>;

    /// Append an order and return it with its id and timestamp
    async fn insert_order(&self, order: &NewOrder) -> Result<Order>;

    /// Orders for `symbol`, oldest first
    async fn orders_for(&self, symbol: &str) -> Result<Vec<Order>>;
}
