use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::aggregate::fold_rows;
use super::errors::OrderError;
use super::value_objects::{Order, OrderId, OrderedProduct, RequestedItem, MAX_QUANTITY};
use crate::context::RequestContext;
use crate::directory::{index_by_id, AccountDirectory, DirectoryError, Product, ProductDirectory, ProductQuery};
use crate::metrics::Metrics;
use crate::store::OrderStore;

// ============================================================================
// Order Composer
// ============================================================================
//
// Write path: AccountDirectory (validate) -> ProductDirectory (resolve) ->
//             price snapshot -> OrderStore::put
// Read path:  OrderStore::list_for_account -> fold -> one batched catalog
//             lookup -> merge metadata
//
// Every step runs under the caller's RequestContext, strictly in sequence.
// Writes are strict: any failure aborts before anything is persisted. Items
// that cannot be priced are dropped, never the order; an order left without
// line items is still stored with a zero total.
// Read enrichment is best-effort: orders come back without metadata when the
// catalog cannot answer, unless the request itself was cancelled or ran out
// of time.
//
// ============================================================================

/// Requested product after merging duplicates and dropping non-positive
/// quantities
#[derive(Debug, Clone, PartialEq, Eq)]
struct Wanted {
    product_id: String,
    quantity: u32,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct MergeOutcome {
    wanted: Vec<Wanted>,
    non_positive: usize,
    out_of_range: usize,
}

/// Merge requested items by product id, first occurrence keeps its position
fn merge_requested(items: &[RequestedItem]) -> MergeOutcome {
    let mut quantities: IndexMap<&str, i64> = IndexMap::new();
    let mut non_positive = 0;

    for item in items {
        if item.quantity <= 0 {
            non_positive += 1;
            continue;
        }
        let total = quantities.entry(item.product_id.as_str()).or_insert(0);
        *total = total.saturating_add(item.quantity);
    }

    let mut out_of_range = 0;
    let wanted = quantities
        .into_iter()
        .filter_map(|(product_id, quantity)| match u32::try_from(quantity) {
            Ok(quantity) if quantity <= MAX_QUANTITY => Some(Wanted {
                product_id: product_id.to_string(),
                quantity,
            }),
            _ => {
                out_of_range += 1;
                None
            }
        })
        .collect();

    MergeOutcome {
        wanted,
        non_positive,
        out_of_range,
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    products: Vec<OrderedProduct>,
    unknown: usize,
    invalid_price: usize,
}

/// Line item snapshots for every wanted product the catalog resolved with a
/// usable price
fn snapshot_line_items(wanted: &[Wanted], catalog: &HashMap<String, Product>) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for w in wanted {
        match catalog.get(&w.product_id) {
            None => snapshot.unknown += 1,
            Some(product) if !product.has_valid_price() => snapshot.invalid_price += 1,
            Some(product) => snapshot.products.push(OrderedProduct {
                id: product.id.clone(),
                name: product.name.clone(),
                description: product.description.clone(),
                price: product.price,
                quantity: w.quantity,
            }),
        }
    }

    snapshot
}

fn distinct_product_ids(orders: &[Order]) -> Vec<String> {
    let ids: IndexSet<&str> = orders.iter().flat_map(Order::product_ids).collect();
    ids.into_iter().map(str::to_string).collect()
}

/// Overlay catalog metadata in place; returns how many line items had no match
fn enrich(orders: &mut [Order], catalog: &HashMap<String, Product>) -> usize {
    let mut misses = 0;
    for item in orders.iter_mut().flat_map(|o| o.products.iter_mut()) {
        match catalog.get(&item.id).filter(|p| p.has_valid_price()) {
            Some(product) => {
                item.name = product.name.clone();
                item.description = product.description.clone();
                item.price = product.price;
            }
            None => misses += 1,
        }
    }
    misses
}

fn account_error(err: DirectoryError, account_id: &str) -> OrderError {
    match err {
        DirectoryError::NotFound => OrderError::AccountNotFound(account_id.to_string()),
        other => OrderError::DirectoryUnavailable(other.to_string()),
    }
}

pub struct OrderComposer {
    accounts: Arc<dyn AccountDirectory>,
    products: Arc<dyn ProductDirectory>,
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
}

impl OrderComposer {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        products: Arc<dyn ProductDirectory>,
        store: Arc<dyn OrderStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            accounts,
            products,
            store,
            metrics,
        }
    }

    /// Place an order for `account_id`.
    ///
    /// Non-positive quantities, products unknown to the catalog and products
    /// without a usable price are left out; if nothing is left the order is
    /// stored without line items. The returned order carries the price
    /// snapshot it was stored with.
    pub async fn place_order(
        &self,
        ctx: &RequestContext,
        account_id: &str,
        items: &[RequestedItem],
    ) -> Result<Order, OrderError> {
        let result = self.compose_and_store(ctx, account_id, items).await;

        match &result {
            Ok(order) => {
                self.metrics.orders_placed.inc();
                tracing::info!(
                    order_id = %order.id,
                    account_id,
                    line_items = order.products.len(),
                    total_price = order.total_price,
                    "✅ Order placed"
                );
            }
            Err(e) => {
                self.metrics.record_failure("place_order", e.reason());
                tracing::warn!(account_id, error = %e, "Order placement failed");
            }
        }

        result
    }

    async fn compose_and_store(
        &self,
        ctx: &RequestContext,
        account_id: &str,
        items: &[RequestedItem],
    ) -> Result<Order, OrderError> {
        self.verify_account(ctx, account_id).await?;

        let merged = merge_requested(items);
        self.metrics.record_dropped_items("non_positive_quantity", merged.non_positive);
        self.metrics.record_dropped_items("quantity_out_of_range", merged.out_of_range);

        // An empty id set means "whole catalog" to the directory.
        let products = if merged.wanted.is_empty() {
            Vec::new()
        } else {
            let ids = merged.wanted.iter().map(|w| w.product_id.clone()).collect();
            let catalog = index_by_id(self.lookup_products(ctx, ProductQuery::by_ids(ids)).await?);

            let snapshot = snapshot_line_items(&merged.wanted, &catalog);
            if snapshot.unknown > 0 {
                self.metrics.record_dropped_items("unknown_product", snapshot.unknown);
                tracing::warn!(account_id, unknown = snapshot.unknown, "Dropping products unknown to the catalog");
            }
            if snapshot.invalid_price > 0 {
                self.metrics.record_dropped_items("invalid_price", snapshot.invalid_price);
                tracing::warn!(
                    account_id,
                    invalid_price = snapshot.invalid_price,
                    "Dropping products with an unusable catalog price"
                );
            }
            snapshot.products
        };

        if products.is_empty() {
            tracing::warn!(account_id, requested = items.len(), "No line item survived, storing empty order");
        }

        let order = Order {
            id: OrderId::generate(),
            created_at: Utc::now(),
            account_id: account_id.to_string(),
            total_price: Order::compute_total(&products),
            products,
        };

        ctx.run(self.store.put(&order)).await?;

        Ok(order)
    }

    /// Every order of `account_id`, newest first, enriched with current
    /// catalog data where the catalog can provide it
    pub async fn orders_for_account(
        &self,
        ctx: &RequestContext,
        account_id: &str,
    ) -> Result<Vec<Order>, OrderError> {
        let rows = match ctx.run(self.store.list_for_account(account_id)).await {
            Ok(rows) => rows,
            Err(e) => {
                self.metrics.record_failure("orders_for_account", e.reason());
                tracing::warn!(account_id, error = %e, "Reading orders failed");
                return Err(e);
            }
        };

        let mut orders = fold_rows(rows);
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids = distinct_product_ids(&orders);
        match self.lookup_products(ctx, ProductQuery::by_ids(ids)).await {
            Ok(products) => {
                let misses = enrich(&mut orders, &index_by_id(products));
                if misses > 0 {
                    self.metrics.enrichment_misses.inc_by(misses as u64);
                    tracing::debug!(account_id, misses, "Line items without catalog match");
                }
            }
            Err(e @ (OrderError::Cancelled | OrderError::DeadlineExceeded)) => {
                self.metrics.record_failure("orders_for_account", e.reason());
                tracing::warn!(account_id, error = %e, "Order read abandoned during enrichment");
                return Err(e);
            }
            Err(e) => {
                self.metrics.enrichment_failures.inc();
                tracing::warn!(
                    account_id,
                    error = %e,
                    "Catalog lookup failed, returning orders without product metadata"
                );
            }
        }

        self.metrics.orders_read.inc_by(orders.len() as u64);
        tracing::debug!(account_id, orders = orders.len(), "Orders loaded");

        Ok(orders)
    }

    async fn verify_account(&self, ctx: &RequestContext, account_id: &str) -> Result<(), OrderError> {
        let started = Instant::now();
        let result = ctx
            .run(async {
                self.accounts
                    .get(ctx, account_id)
                    .await
                    .map_err(|e| account_error(e, account_id))
            })
            .await;
        self.metrics
            .record_directory_call("account", started.elapsed(), result.is_ok());

        result.map(|_| ())
    }

    async fn lookup_products(&self, ctx: &RequestContext, query: ProductQuery) -> Result<Vec<Product>, OrderError> {
        let started = Instant::now();
        let result = ctx
            .run(async {
                self.products
                    .get(ctx, query)
                    .await
                    .map_err(|e| OrderError::DirectoryUnavailable(e.to_string()))
            })
            .await;
        self.metrics
            .record_directory_call("catalog", started.elapsed(), result.is_ok());

        result
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
