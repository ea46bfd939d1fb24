// ============================================================================
// HTTP API
// ============================================================================
//
// - POST /accounts/{account_id}/orders   place an order
// - GET  /accounts/{account_id}/orders   list orders, newest first
// - GET  /metrics                        prometheus text format
// - GET  /health                         order store reachability
//
// ============================================================================

mod handlers;
mod server;

use actix_web::web;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::order::OrderComposer;
use crate::metrics::Metrics;
use crate::store::OrderStore;
use crate::utils::CircuitBreaker;

pub use handlers::{configure, PlaceOrderRequest, REQUEST_TIMEOUT_HEADER};
pub use server::start_http_server;

/// Shared by every worker
pub struct AppState {
    pub composer: Arc<OrderComposer>,
    pub metrics: Arc<Metrics>,
    pub store: Arc<dyn OrderStore>,
    pub breakers: Vec<CircuitBreaker>,
    pub request_timeout: Duration,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn into_data(self) -> web::Data<AppState> {
        web::Data::new(self)
    }
}
