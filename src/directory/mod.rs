// ============================================================================
// Directories - remote lookups the order service depends on
// ============================================================================
//
// The account and catalog services are owned elsewhere; the order service
// only consumes their lookup contracts:
// - AccountDirectory: does this account exist?
// - ProductDirectory: current name/description/price for a set of products
//
// ============================================================================

mod grpc;
mod memory;
pub mod proto;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::context::RequestContext;

pub use grpc::{GrpcAccountDirectory, GrpcProductDirectory};
pub use memory::{StaticAccountDirectory, StaticProductDirectory};

/// Default and maximum page size of a catalog listing
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Account {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// Catalog lookup. Empty `ids` and no `query` means "a page of everything".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductQuery {
    pub ids: Vec<String>,
    pub query: Option<String>,
    pub skip: u64,
    pub take: u64,
}

impl Product {
    /// Finite and non-negative; anything else cannot be priced into an order
    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price >= 0.0
    }
}

impl ProductQuery {
    /// Exact lookup of `ids`, sized so one page holds every id
    pub fn by_ids(ids: Vec<String>) -> Self {
        let take = ids.len() as u64;
        Self {
            ids,
            query: None,
            skip: 0,
            take,
        }
    }

    /// Apply the catalog paging rules: zero or oversized pages become the
    /// default page size. Id lookups are not paged.
    pub fn normalized(mut self) -> Self {
        if self.ids.is_empty() && (self.take == 0 || self.take > MAX_PAGE_SIZE) {
            self.take = MAX_PAGE_SIZE;
        }
        self
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("not found")]
    NotFound,

    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("circuit breaker open for {0}")]
    CircuitOpen(&'static str),
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn get(&self, ctx: &RequestContext, account_id: &str) -> Result<Account, DirectoryError>;
}

#[async_trait]
pub trait ProductDirectory: Send + Sync {
    /// Products matching `query`; unknown ids are simply absent from the result
    async fn get(&self, ctx: &RequestContext, query: ProductQuery) -> Result<Vec<Product>, DirectoryError>;
}

/// Index products by id for merging
pub fn index_by_id(products: Vec<Product>) -> HashMap<String, Product> {
    products.into_iter().map(|p| (p.id.clone(), p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_ids_sizes_page_to_ids() {
        let query = ProductQuery::by_ids(vec!["P1".into(), "P2".into(), "P3".into()]);
        assert_eq!(query.take, 3);
        assert_eq!(query.skip, 0);
        assert!(query.query.is_none());
    }

    #[test]
    fn test_default_query_gets_default_page() {
        let query = ProductQuery::default().normalized();
        assert_eq!(query.take, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_oversized_search_is_capped() {
        let query = ProductQuery {
            query: Some("shoe".into()),
            skip: 10,
            take: 5000,
            ..ProductQuery::default()
        }
        .normalized();
        assert_eq!(query.take, MAX_PAGE_SIZE);
        assert_eq!(query.skip, 10);
    }

    #[test]
    fn test_price_validity() {
        let priced = |price| Product { id: "P1".into(), name: String::new(), description: String::new(), price };

        assert!(priced(0.0).has_valid_price());
        assert!(priced(9.99).has_valid_price());
        assert!(!priced(-5.0).has_valid_price());
        assert!(!priced(f64::NAN).has_valid_price());
        assert!(!priced(f64::INFINITY).has_valid_price());
    }

    #[test]
    fn test_index_by_id() {
        let index = index_by_id(vec![
            Product { id: "P1".into(), name: "One".into(), description: String::new(), price: 1.0 },
            Product { id: "P2".into(), name: "Two".into(), description: String::new(), price: 2.0 },
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index["P2"].name, "Two");
    }
}
