use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use uuid::Uuid;

use super::{LineItemRow, OrderRow, OrderStore, StoreError};
use crate::domain::order::Order;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL,
        account_id TEXT NOT NULL,
        total_price DOUBLE PRECISION NOT NULL CHECK (total_price >= 0)
    )",
    "CREATE INDEX IF NOT EXISTS orders_account_created_idx
        ON orders (account_id, created_at DESC)",
    "CREATE TABLE IF NOT EXISTS order_products (
        order_id UUID NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        product_id TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        PRIMARY KEY (order_id, position)
    )",
];

// Rows of one order stay contiguous: id breaks created_at ties. The outer join
// keeps orders stored without line items.
const LIST_FOR_ACCOUNT: &str = "SELECT o.id, o.created_at, o.account_id, o.total_price,
            op.product_id, op.quantity
     FROM orders o
     LEFT JOIN order_products op ON o.id = op.order_id
     WHERE o.account_id = $1
     ORDER BY o.created_at DESC, o.id, op.position";

// ============================================================================
// Postgres Order Store
// ============================================================================

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Open a connection pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Order schema ensured");
        Ok(())
    }

}

/// Column arrays for the UNNEST bulk insert of line items
fn line_item_columns(order: &Order) -> Result<(Vec<i32>, Vec<String>, Vec<i32>), StoreError> {
    let mut positions = Vec::with_capacity(order.products.len());
    let mut product_ids = Vec::with_capacity(order.products.len());
    let mut quantities = Vec::with_capacity(order.products.len());

    for (position, product) in order.products.iter().enumerate() {
        let position = i32::try_from(position)
            .map_err(|_| StoreError::Corrupt(format!("too many line items in order {}", order.id)))?;
        let quantity = i32::try_from(product.quantity).map_err(|_| {
            StoreError::Corrupt(format!("quantity {} out of range for {}", product.quantity, product.id))
        })?;
        positions.push(position);
        product_ids.push(product.id.clone());
        quantities.push(quantity);
    }

    Ok((positions, product_ids, quantities))
}

/// Both line item columns are NULL for an order without line items
fn line_item(product_id: Option<String>, quantity: Option<i32>) -> Result<Option<LineItemRow>, StoreError> {
    match (product_id, quantity) {
        (Some(product_id), Some(quantity)) => {
            let quantity = u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("negative quantity {}", quantity)))?;
            Ok(Some(LineItemRow { product_id, quantity }))
        }
        (None, None) => Ok(None),
        (product_id, quantity) => Err(StoreError::Corrupt(format!(
            "half-null line item: product_id={:?} quantity={:?}",
            product_id, quantity
        ))),
    }
}

fn decode_row(row: &PgRow) -> Result<OrderRow, StoreError> {
    Ok(OrderRow {
        order_id: row.try_get::<Uuid, _>("id")?.into(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        account_id: row.try_get("account_id")?,
        total_price: row.try_get("total_price")?,
        line_item: line_item(row.try_get("product_id")?, row.try_get("quantity")?)?,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn put(&self, order: &Order) -> Result<(), StoreError> {
        let (positions, product_ids, quantities) = line_item_columns(order)?;

        // Dropping `tx` without commit rolls back, including on cancellation.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, created_at, account_id, total_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id.as_uuid())
        .bind(order.created_at)
        .bind(&order.account_id)
        .bind(order.total_price)
        .execute(&mut *tx)
        .await?;

        if !positions.is_empty() {
            sqlx::query(
                "INSERT INTO order_products (order_id, position, product_id, quantity)
                 SELECT $1, item.position, item.product_id, item.quantity
                 FROM UNNEST($2::INTEGER[], $3::TEXT[], $4::INTEGER[])
                     AS item(position, product_id, quantity)",
            )
            .bind(order.id.as_uuid())
            .bind(&positions)
            .bind(&product_ids)
            .bind(&quantities)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            account_id = %order.account_id,
            line_items = order.products.len(),
            "✅ Persisted order"
        );

        Ok(())
    }

    async fn list_for_account(&self, account_id: &str) -> Result<Vec<OrderRow>, StoreError> {
        let rows = sqlx::query(LIST_FOR_ACCOUNT)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(account_id, rows = rows.len(), "Loaded order rows");

        rows.iter().map(decode_row).collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
