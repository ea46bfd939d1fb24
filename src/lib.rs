//! Order composition service.
//!
//! Places orders for customer accounts and reads them back as nested
//! aggregates, validating accounts against the account service and pricing
//! line items from the catalog service.

pub mod api;
pub mod config;
pub mod context;
pub mod directory;
pub mod domain;
pub mod metrics;
pub mod store;
pub mod utils;

pub use context::RequestContext;
pub use domain::order::{Order, OrderComposer, OrderError, OrderId, OrderedProduct, RequestedItem};
