use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{Account, AccountDirectory, DirectoryError, Product, ProductDirectory, ProductQuery};
use crate::context::RequestContext;

// ============================================================================
// In-Process Directories
// ============================================================================
//
// Fixed account/product tables with switchable outages and call counters.
// They honour the same lookup contracts as the gRPC clients.
//
// ============================================================================

#[derive(Default)]
pub struct StaticAccountDirectory {
    accounts: HashMap<String, Account>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl StaticAccountDirectory {
    pub fn new<I, S>(account_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accounts = account_ids
            .into_iter()
            .map(|id| {
                let id: String = id.into();
                let account = Account {
                    id: id.clone(),
                    name: format!("account {}", id),
                };
                (id, account)
            })
            .collect();

        Self {
            accounts,
            ..Self::default()
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountDirectory for StaticAccountDirectory {
    async fn get(&self, _ctx: &RequestContext, account_id: &str) -> Result<Account, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("account directory offline".to_string()));
        }

        self.accounts
            .get(account_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}

#[derive(Default)]
pub struct StaticProductDirectory {
    products: Mutex<Vec<Product>>,
    unavailable: AtomicBool,
    delay: Mutex<Option<Duration>>,
    queries: Mutex<Vec<ProductQuery>>,
}

impl StaticProductDirectory {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Answer every lookup only after `delay`
    pub fn set_delay(&self, delay: Option<Duration>) {
        if let Ok(mut current) = self.delay.lock() {
            *current = delay;
        }
    }

    /// Replace the catalog, e.g. to simulate price changes or delistings
    pub fn replace(&self, products: Vec<Product>) {
        if let Ok(mut current) = self.products.lock() {
            *current = products;
        }
    }

    /// Every query received so far
    pub fn queries(&self) -> Vec<ProductQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ProductDirectory for StaticProductDirectory {
    async fn get(&self, _ctx: &RequestContext, query: ProductQuery) -> Result<Vec<Product>, DirectoryError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        let delay = self.delay.lock().ok().and_then(|delay| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("catalog offline".to_string()));
        }

        let query = query.normalized();
        let products = self
            .products
            .lock()
            .map_err(|_| DirectoryError::Unavailable("catalog lock poisoned".to_string()))?;

        if !query.ids.is_empty() {
            let wanted: HashSet<&str> = query.ids.iter().map(String::as_str).collect();
            return Ok(products
                .iter()
                .filter(|p| wanted.contains(p.id.as_str()))
                .cloned()
                .collect());
        }

        let needle = query.query.as_deref().map(str::to_lowercase);
        Ok(products
            .iter()
            .filter(|p| match &needle {
                Some(needle) => {
                    p.name.to_lowercase().contains(needle)
                        || p.description.to_lowercase().contains(needle)
                }
                None => true,
            })
            .skip(query.skip as usize)
            .take(query.take as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, price: f64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} description", name),
            price,
        }
    }

    fn catalog() -> StaticProductDirectory {
        StaticProductDirectory::new(vec![
            product("P1", "Red Shoe", 9.99),
            product("P2", "Blue Hat", 5.0),
            product("P3", "Red Scarf", 12.5),
        ])
    }

    #[tokio::test]
    async fn test_account_lookup() {
        let directory = StaticAccountDirectory::new(["A1"]);
        let ctx = RequestContext::background();

        assert_eq!(directory.get(&ctx, "A1").await.unwrap().id, "A1");
        assert!(matches!(directory.get(&ctx, "A2").await, Err(DirectoryError::NotFound)));

        directory.set_unavailable(true);
        assert!(matches!(directory.get(&ctx, "A1").await, Err(DirectoryError::Unavailable(_))));
        assert_eq!(directory.calls(), 3);
    }

    #[tokio::test]
    async fn test_lookup_by_ids_skips_unknown() {
        let directory = catalog();
        let ctx = RequestContext::background();

        let found = directory
            .get(&ctx, ProductQuery::by_ids(vec!["P3".into(), "missing".into()]))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "P3");
    }

    #[tokio::test]
    async fn test_empty_query_returns_default_page() {
        let directory = catalog();
        let ctx = RequestContext::background();

        let found = directory.get(&ctx, ProductQuery::default()).await.unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn test_search_with_paging() {
        let directory = catalog();
        let ctx = RequestContext::background();

        let query = ProductQuery {
            query: Some("red".into()),
            skip: 1,
            take: 10,
            ..ProductQuery::default()
        };

        let found = directory.get(&ctx, query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "P3");
    }

    #[tokio::test]
    async fn test_queries_are_recorded() {
        let directory = catalog();
        let ctx = RequestContext::background();
        directory.set_unavailable(true);

        let result = directory.get(&ctx, ProductQuery::by_ids(vec!["P1".into()])).await;

        assert!(result.is_err());
        assert_eq!(directory.queries().len(), 1);
        assert_eq!(directory.queries()[0].ids, vec!["P1"]);
    }
}
