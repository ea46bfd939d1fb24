use clap::Parser;
use std::time::Duration;

use crate::utils::CircuitBreakerConfig;

/// Order service configuration, from flags or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "order_composer", version, about = "Composes customer orders across account, catalog and order storage")]
pub struct Config {
    /// PostgreSQL connection URL for order storage
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// gRPC endpoint of the account service
    #[arg(long, env = "ACCOUNT_SERVICE_URL")]
    pub account_service_url: String,

    /// gRPC endpoint of the catalog service
    #[arg(long, env = "CATALOG_SERVICE_URL")]
    pub catalog_service_url: String,

    #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Budget for one request unless the caller sends a tighter one
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Consecutive directory failures before its circuit opens
    #[arg(long, env = "BREAKER_FAILURE_THRESHOLD", default_value_t = 5)]
    pub breaker_failure_threshold: u32,

    /// Seconds an open circuit waits before probing
    #[arg(long, env = "BREAKER_TIMEOUT_SECS", default_value_t = 30)]
    pub breaker_timeout_secs: u64,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.breaker_failure_threshold.max(1),
            timeout: Duration::from_secs(self.breaker_timeout_secs),
            ..CircuitBreakerConfig::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.request_timeout_ms > 0, "request timeout must be positive");
        anyhow::ensure!(self.db_max_connections > 0, "at least one database connection is required");
        Ok(())
    }
}
