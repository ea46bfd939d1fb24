use async_trait::async_trait;
use std::time::Duration;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use super::proto;
use super::{Account, AccountDirectory, DirectoryError, Product, ProductDirectory, ProductQuery};
use crate::context::RequestContext;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

// ============================================================================
// gRPC Directory Clients
// ============================================================================
//
// Thin unary clients for the account and catalog services. Channels connect
// lazily, so the order service can start before its neighbours. Each client
// sits behind its own circuit breaker; "not found" answers are not failures
// as far as the breaker is concerned.
//
// ============================================================================

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn lazy_channel(url: &str) -> Result<Channel, tonic::transport::Error> {
    Ok(Endpoint::from_shared(url.to_string())?
        .connect_timeout(CONNECT_TIMEOUT)
        .connect_lazy())
}

/// One unary call; the remaining request budget travels as the gRPC timeout
async fn unary<Req, Resp>(
    channel: Channel,
    path: &'static str,
    ctx: &RequestContext,
    message: Req,
) -> Result<Resp, Status>
where
    Req: prost::Message + Send + Sync + 'static,
    Resp: prost::Message + Default + Send + Sync + 'static,
{
    let mut grpc = tonic::client::Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|e| Status::unavailable(format!("service was not ready: {}", e)))?;

    let mut request = tonic::Request::new(message);
    if let Some(remaining) = ctx.remaining() {
        request.set_timeout(remaining);
    }

    let codec = tonic_prost::ProstCodec::<Req, Resp>::default();
    let response = grpc
        .unary(request, PathAndQuery::from_static(path), codec)
        .await?;

    Ok(response.into_inner())
}

fn breaker_error(err: CircuitBreakerError<Status>, directory: &'static str) -> DirectoryError {
    match err {
        CircuitBreakerError::CircuitOpen => DirectoryError::CircuitOpen(directory),
        CircuitBreakerError::OperationFailed(status) => DirectoryError::Unavailable(format!(
            "{} {:?}: {}",
            directory,
            status.code(),
            status.message()
        )),
    }
}

// ============================================================================
// Account Directory
// ============================================================================

#[derive(Clone)]
pub struct GrpcAccountDirectory {
    channel: Channel,
    breaker: CircuitBreaker,
}

impl GrpcAccountDirectory {
    pub fn connect_lazy(url: &str, breaker: CircuitBreakerConfig) -> Result<Self, tonic::transport::Error> {
        Ok(Self {
            channel: lazy_channel(url)?,
            breaker: CircuitBreaker::new("account", breaker),
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl AccountDirectory for GrpcAccountDirectory {
    async fn get(&self, ctx: &RequestContext, account_id: &str) -> Result<Account, DirectoryError> {
        let request = proto::GetAccountRequest {
            id: account_id.to_string(),
        };

        let found = self
            .breaker
            .call(async {
                match unary::<_, proto::GetAccountResponse>(
                    self.channel.clone(),
                    proto::GET_ACCOUNT_PATH,
                    ctx,
                    request,
                )
                .await
                {
                    Ok(response) => Ok(response.account),
                    Err(status) if status.code() == Code::NotFound => Ok(None),
                    Err(status) => Err(status),
                }
            })
            .await
            .map_err(|e| breaker_error(e, "account"))?;

        found.map(Account::from).ok_or(DirectoryError::NotFound)
    }
}

// ============================================================================
// Product Directory
// ============================================================================

#[derive(Clone)]
pub struct GrpcProductDirectory {
    channel: Channel,
    breaker: CircuitBreaker,
}

impl GrpcProductDirectory {
    pub fn connect_lazy(url: &str, breaker: CircuitBreakerConfig) -> Result<Self, tonic::transport::Error> {
        Ok(Self {
            channel: lazy_channel(url)?,
            breaker: CircuitBreaker::new("catalog", breaker),
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl ProductDirectory for GrpcProductDirectory {
    async fn get(&self, ctx: &RequestContext, query: ProductQuery) -> Result<Vec<Product>, DirectoryError> {
        let request = proto::GetProductsRequest::from(query.normalized());

        let response = self
            .breaker
            .call(unary::<_, proto::GetProductsResponse>(
                self.channel.clone(),
                proto::GET_PRODUCTS_PATH,
                ctx,
                request,
            ))
            .await
            .map_err(|e| breaker_error(e, "catalog"))?;

        tracing::debug!(products = response.products.len(), "Catalog lookup answered");

        Ok(response.products.into_iter().map(Product::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_error_mapping() {
        let open = breaker_error(CircuitBreakerError::CircuitOpen, "catalog");
        assert!(matches!(open, DirectoryError::CircuitOpen("catalog")));

        let failed = breaker_error(
            CircuitBreakerError::OperationFailed(Status::unavailable("connection refused")),
            "account",
        );
        match failed {
            DirectoryError::Unavailable(message) => {
                assert!(message.contains("account"));
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let result = GrpcAccountDirectory::connect_lazy("not a url", CircuitBreakerConfig::default());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_catalog_reports_unavailable() {
        let directory = GrpcProductDirectory::connect_lazy(
            "http://127.0.0.1:1",
            CircuitBreakerConfig::default(),
        )
        .unwrap();
        let ctx = RequestContext::with_timeout(Duration::from_secs(2));

        let result = directory
            .get(&ctx, ProductQuery::by_ids(vec!["P1".to_string()]))
            .await;

        assert!(matches!(result, Err(DirectoryError::Unavailable(_))));
    }
}
