// ============================================================================
// Wire messages of the account and catalog gRPC services (package `pb`)
// ============================================================================

pub const GET_ACCOUNT_PATH: &str = "/pb.AccountService/GetAccount";
pub const GET_PRODUCTS_PATH: &str = "/pb.CatalogService/GetProducts";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Account {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAccountRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<Account>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Product {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(double, tag = "4")]
    pub price: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetProductsRequest {
    #[prost(uint64, tag = "1")]
    pub skip: u64,
    #[prost(uint64, tag = "2")]
    pub take: u64,
    #[prost(string, repeated, tag = "3")]
    pub ids: Vec<String>,
    #[prost(string, tag = "4")]
    pub query: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetProductsResponse {
    #[prost(message, repeated, tag = "1")]
    pub products: Vec<Product>,
}

impl From<Account> for super::Account {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
        }
    }
}

impl From<Product> for super::Product {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
        }
    }
}

impl From<super::ProductQuery> for GetProductsRequest {
    fn from(query: super::ProductQuery) -> Self {
        Self {
            skip: query.skip,
            take: query.take,
            ids: query.ids,
            query: query.query.unwrap_or_default(),
        }
    }
}
