use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{OrderRow, OrderStore, StoreError};
use crate::domain::order::{flatten, Order};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Keeps orders as flattened rows, the same shape the Postgres join returns,
// and hands them back in the store contract's order. `put_calls` lets tests
// assert the store was never touched.
//
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderStore {
    rows: Mutex<Vec<OrderRow>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    put_calls: AtomicUsize,
    write_delay: Mutex<Option<Duration>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Delay every `put` before it commits anything
    pub async fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock().await = delay;
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    /// Insert raw rows as-is, bypassing `put`
    pub async fn insert_rows(&self, rows: impl IntoIterator<Item = OrderRow>) {
        self.rows.lock().await.extend(rows);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn put(&self, order: &Order) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.write_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("simulated write failure".to_string()));
        }

        // Single extend under one lock: readers see all rows of the order or none.
        let new_rows = flatten(order);
        self.rows.lock().await.extend(new_rows);
        Ok(())
    }

    async fn list_for_account(&self, account_id: &str) -> Result<Vec<OrderRow>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("simulated read failure".to_string()));
        }

        let mut rows: Vec<OrderRow> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| row.account_id == account_id)
            .cloned()
            .collect();

        // Stable sort keeps insertion order of line items within an order.
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });

        Ok(rows)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("simulated outage".to_string()));
        }
        Ok(())
    }
}
