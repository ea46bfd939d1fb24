use indexmap::IndexMap;

use super::value_objects::{Order, OrderId, OrderedProduct};
use crate::store::{LineItemRow, OrderRow};

// ============================================================================
// Order Aggregation - flat store rows <-> nested order aggregates
// ============================================================================
//
// The store returns one row per order x product. Folding groups rows by order
// id, keeps orders in the order their first row was seen and keeps line items
// in row order. Grouping is keyed, so rows of one order do not have to be
// contiguous; header fields come from the first row of each order. A row
// without a line item still yields its order header.
//
// ============================================================================

/// Fold joined rows into order aggregates. Line items carry only id and
/// quantity; product metadata is filled in by enrichment.
pub fn fold_rows<I>(rows: I) -> Vec<Order>
where
    I: IntoIterator<Item = OrderRow>,
{
    let mut orders: IndexMap<OrderId, Order> = IndexMap::new();

    for row in rows {
        let order = orders.entry(row.order_id).or_insert_with(|| Order {
            id: row.order_id,
            created_at: row.created_at,
            account_id: row.account_id.clone(),
            total_price: row.total_price,
            products: Vec::new(),
        });

        if let Some(item) = row.line_item {
            order
                .products
                .push(OrderedProduct::bare(item.product_id, item.quantity));
        }
    }

    orders.into_values().collect()
}

/// Inverse of `fold_rows`: one row per line item, in line item order, or a
/// single header row when the order has no line items
pub fn flatten(order: &Order) -> Vec<OrderRow> {
    let header = |line_item| OrderRow {
        order_id: order.id,
        created_at: order.created_at,
        account_id: order.account_id.clone(),
        total_price: order.total_price,
        line_item,
    };

    if order.products.is_empty() {
        return vec![header(None)];
    }

    order
        .products
        .iter()
        .map(|product| {
            header(Some(LineItemRow {
                product_id: product.id.clone(),
                quantity: product.quantity,
            }))
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn row(order: u128, created_secs: i64, product: &str, quantity: u32) -> OrderRow {
        OrderRow {
            order_id: OrderId(Uuid::from_u128(order)),
            created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
            account_id: "A1".to_string(),
            total_price: 10.0,
            line_item: Some(LineItemRow {
                product_id: product.to_string(),
                quantity,
            }),
        }
    }

    fn header_row(order: u128, created_secs: i64) -> OrderRow {
        OrderRow {
            line_item: None,
            total_price: 0.0,
            ..row(order, created_secs, "", 0)
        }
    }

    fn line_items(order: &Order) -> Vec<(&str, u32)> {
        order
            .products
            .iter()
            .map(|p| (p.id.as_str(), p.quantity))
            .collect()
    }

    #[test]
    fn test_empty_input_emits_nothing() {
        assert!(fold_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_row() {
        let orders = fold_rows(vec![row(1, 100, "P1", 2)]);

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, OrderId(Uuid::from_u128(1)));
        assert_eq!(line_items(&orders[0]), vec![("P1", 2)]);
    }

    #[test]
    fn test_contiguous_rows_newest_first() {
        let orders = fold_rows(vec![
            row(2, 200, "P3", 1),
            row(2, 200, "P1", 5),
            row(1, 100, "P1", 2),
            row(1, 100, "P2", 1),
        ]);

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, OrderId(Uuid::from_u128(2)));
        assert_eq!(line_items(&orders[0]), vec![("P3", 1), ("P1", 5)]);
        assert_eq!(orders[1].id, OrderId(Uuid::from_u128(1)));
        assert_eq!(line_items(&orders[1]), vec![("P1", 2), ("P2", 1)]);
        assert!(orders[0].created_at > orders[1].created_at);
    }

    #[test]
    fn test_interleaved_rows_are_grouped_by_first_seen() {
        let orders = fold_rows(vec![
            row(1, 100, "P1", 1),
            row(2, 200, "P2", 1),
            row(1, 100, "P3", 1),
        ]);

        assert_eq!(orders.len(), 2);
        assert_eq!(line_items(&orders[0]), vec![("P1", 1), ("P3", 1)]);
        assert_eq!(line_items(&orders[1]), vec![("P2", 1)]);
    }

    #[test]
    fn test_header_without_line_item_is_kept() {
        let orders = fold_rows(vec![
            row(2, 200, "P1", 1),
            header_row(1, 100),
        ]);

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].id, OrderId(Uuid::from_u128(1)));
        assert!(orders[1].products.is_empty());
        assert_eq!(orders[1].total_price, 0.0);
    }

    #[test]
    fn test_flatten_order_without_line_items() {
        let orders = fold_rows(vec![header_row(7, 100)]);
        let rows = flatten(&orders[0]);

        assert_eq!(rows, vec![header_row(7, 100)]);
    }

    #[test]
    fn test_folded_line_items_have_no_metadata() {
        let orders = fold_rows(vec![row(1, 100, "P1", 2)]);
        let item = &orders[0].products[0];

        assert!(item.name.is_empty());
        assert_eq!(item.price, 0.0);
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    fn arb_order(index: u128) -> impl Strategy<Value = Order> {
        (
            0i64..1_000_000,
            0.0f64..10_000.0,
            prop::collection::vec(("[A-Z][0-9]{1,3}", 1u32..50), 0..6),
        )
            .prop_map(move |(secs, total, items)| Order {
                id: OrderId(Uuid::from_u128(index + 1)),
                created_at: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
                account_id: "A1".to_string(),
                total_price: total,
                products: items
                    .into_iter()
                    .map(|(id, qty)| OrderedProduct::bare(id, qty))
                    .collect(),
            })
    }

    fn arb_orders() -> impl Strategy<Value = Vec<Order>> {
        (0usize..8).prop_flat_map(|n| {
            (0..n as u128).map(arb_order).collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn prop_fold_inverts_flatten(orders in arb_orders()) {
            let rows: Vec<OrderRow> = orders.iter().flat_map(flatten).collect();
            let folded = fold_rows(rows);

            prop_assert_eq!(folded, orders);
        }

        #[test]
        fn prop_one_order_per_distinct_id(orders in arb_orders()) {
            let rows: Vec<OrderRow> = orders.iter().flat_map(flatten).collect();
            let distinct: HashSet<OrderId> = rows.iter().map(|r| r.order_id).collect();
            let item_rows = rows.iter().filter(|r| r.line_item.is_some()).count();

            let folded = fold_rows(rows);

            prop_assert_eq!(folded.len(), distinct.len());
            let line_items: usize = folded.iter().map(|o| o.products.len()).sum();
            prop_assert_eq!(line_items, item_rows);
        }
    }
}
