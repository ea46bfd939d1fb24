use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Responder, ResponseError};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::AppState;
use crate::context::RequestContext;
use crate::domain::order::{OrderError, RequestedItem};

/// Optional per-request budget in milliseconds; can only tighten the default
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub products: Vec<RequestedItem>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    reason: &'static str,
    retryable: bool,
}

impl ResponseError for OrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            OrderError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            OrderError::DirectoryUnavailable(_) | OrderError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            OrderError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            OrderError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            reason: self.reason(),
            retryable: self.is_retryable(),
        })
    }
}

fn request_context(state: &AppState, req: &HttpRequest) -> RequestContext {
    let ctx = RequestContext::with_timeout(state.request_timeout).child_of(&state.shutdown);

    let requested = req
        .headers()
        .get(REQUEST_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    match requested {
        Some(ms) => ctx.timeout(Duration::from_millis(ms)),
        None => ctx,
    }
}

async fn place_order(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, OrderError> {
    let account_id = path.into_inner();
    let ctx = request_context(&state, &req);

    let order = state
        .composer
        .place_order(&ctx, &account_id, &body.products)
        .await?;

    Ok(HttpResponse::Created().json(order))
}

async fn orders_for_account(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, OrderError> {
    let account_id = path.into_inner();
    let ctx = request_context(&state, &req);

    let orders = state.composer.orders_for_account(&ctx, &account_id).await?;

    Ok(HttpResponse::Ok().json(orders))
}

async fn metrics_handler(state: web::Data<AppState>) -> impl Responder {
    for breaker in &state.breakers {
        let breaker_state = breaker.get_state().await;
        state.metrics.set_breaker_state(breaker.name(), breaker_state.as_gauge());
    }

    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    match state.store.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "service": "order-composer"
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Order store health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "order-composer",
                "error": e.to_string()
            }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/accounts/{account_id}/orders", web::post().to(place_order))
        .route("/accounts/{account_id}/orders", web::get().to(orders_for_account))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}
