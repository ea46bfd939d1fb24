// ============================================================================
// Order Store - persistence boundary for order aggregates
// ============================================================================
//
// Orders are written as a header plus line items in one transaction and read
// back as flat joined rows, one per order x product. An order without line
// items comes back as a single row with no line item. Folding rows back into
// aggregates lives in `domain::order::aggregate`.
//
// ============================================================================

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::order::{Order, OrderId};

pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

/// One row of the orders x order_products outer join
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
    pub account_id: String,
    pub total_price: f64,
    /// `None` for an order stored without line items
    pub line_item: Option<LineItemRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRow {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist header and every line item atomically
    async fn put(&self, order: &Order) -> Result<(), StoreError>;

    /// Rows for every order of the account, newest order first, line items in
    /// insertion order, rows of one order contiguous
    async fn list_for_account(&self, account_id: &str) -> Result<Vec<OrderRow>, StoreError>;

    /// Cheap liveness check for `/health`
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
