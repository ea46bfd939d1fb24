use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Largest quantity a single line item may carry (fits the INTEGER column)
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Order identifier - UUIDv7, so the string form sorts by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for OrderId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Line item of an order.
///
/// `name`, `description` and `price` are a snapshot: filled at placement, and
/// overlaid from the catalog on read. They stay blank when the catalog no
/// longer knows the product.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderedProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub quantity: u32,
}

impl OrderedProduct {
    /// Line item as it comes back from storage, before enrichment
    pub fn bare(id: impl Into<String>, quantity: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            price: 0.0,
            quantity,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub account_id: String,
    pub total_price: f64,
    pub products: Vec<OrderedProduct>,
}

impl Order {
    /// Sum of price x quantity over the line items, in line item order
    pub fn compute_total(products: &[OrderedProduct]) -> f64 {
        // fold from +0.0: an empty float `sum` yields -0.0
        products
            .iter()
            .fold(0.0, |total, product| total + product.line_total())
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|p| p.id.as_str())
    }
}

/// What a caller asks for when placing an order. Non-positive quantities are
/// representable here and get dropped by the composer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestedItem {
    pub product_id: String,
    pub quantity: i64,
}

impl RequestedItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
