//! Service configuration loaded via OrthoConfig.
//!
//! Every value can come from CLI flags, `COURSE_*` environment variables or
//! a configuration file. Numeric tunables carry declared defaults; the
//! remaining unset values fall back to the defaults exposed by the accessors
//! below.

use std::fmt;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::{CatalogueConfig, CircuitBreakerConfig, RetryPolicy};
use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Configuration values for the course service.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COURSE")]
pub struct ServiceSettings {
    /// Socket address for the HTTP listener.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; in-memory repositories are used when absent.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    #[ortho_config(default = 10)]
    pub pool_size: u32,
    /// Base URL of the identity service.
    pub identity_url: Option<String>,
    /// Identity request timeout in milliseconds.
    #[ortho_config(default = 2000)]
    pub identity_timeout_ms: u64,
    /// Consecutive identity failures that open the breaker.
    pub breaker_threshold: Option<u32>,
    /// Seconds the breaker stays open.
    pub breaker_cooldown_secs: Option<u64>,
    /// Base64 HMAC secret shared with the token issuer.
    pub jwt_secret: Option<String>,
    /// Mean rating a course must exceed to count as popular.
    pub popular_threshold: Option<f64>,
    /// Window for the `new` listing.
    pub recent_days: Option<u32>,
    /// AMQP broker URI; the rating consumer is disabled when absent.
    pub amqp_uri: Option<String>,
    /// Optimistic write attempts per rating event.
    pub rating_retry_attempts: Option<u32>,
    /// Unacknowledged deliveries per consumer.
    #[ortho_config(default = 16)]
    pub prefetch: u16,
}

impl fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("pool_size", &self.pool_size)
            .field("identity_url", &self.identity_url)
            .field("identity_timeout_ms", &self.identity_timeout_ms)
            .field("breaker_threshold", &self.breaker_threshold)
            .field("breaker_cooldown_secs", &self.breaker_cooldown_secs)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("popular_threshold", &self.popular_threshold)
            .field("recent_days", &self.recent_days)
            .field("amqp_uri", &self.amqp_uri.as_ref().map(|_| "<set>"))
            .field("rating_retry_attempts", &self.rating_retry_attempts)
            .field("prefetch", &self.prefetch)
            .finish()
    }
}

impl ServiceSettings {
    /// Parse the listener address.
    ///
    /// # Errors
    ///
    /// Returns [`AddrParseError`] when the configured value is not a socket
    /// address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR).parse()
    }

    /// Pool configuration when a database is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        self.database_url.as_ref().map(|url| {
            PoolConfig::new(url.clone()).with_max_size(self.pool_size.max(1))
        })
    }

    /// Parse the identity service base URL, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] for a malformed URL.
    pub fn identity_url(&self) -> Result<Option<Url>, url::ParseError> {
        self.identity_url.as_deref().map(Url::parse).transpose()
    }

    /// Identity request timeout.
    pub fn identity_timeout(&self) -> Duration {
        Duration::from_millis(self.identity_timeout_ms)
    }

    /// Breaker tuning with defaults for unset values.
    pub fn breaker(&self) -> CircuitBreakerConfig {
        let defaults = CircuitBreakerConfig::default();
        CircuitBreakerConfig {
            failure_threshold: self
                .breaker_threshold
                .unwrap_or(defaults.failure_threshold)
                .max(1),
            open_cooldown: self
                .breaker_cooldown_secs
                .map_or(defaults.open_cooldown, Duration::from_secs),
        }
    }

    /// Catalogue query tunables.
    pub fn catalogue(&self) -> CatalogueConfig {
        let defaults = CatalogueConfig::default();
        CatalogueConfig {
            popular_threshold: self.popular_threshold.unwrap_or(defaults.popular_threshold),
            recent_days: self.recent_days.unwrap_or(defaults.recent_days),
        }
    }

    /// Rating retry tuning.
    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self
                .rating_retry_attempts
                .unwrap_or(defaults.max_attempts)
                .max(1),
            ..defaults
        }
    }

    /// Consumer prefetch count; zero would mean unbounded and is raised to one.
    pub fn prefetch(&self) -> u16 {
        self.prefetch.max(1)
    }

    /// Move the token secret out of the settings.
    ///
    /// The returned buffer is wiped on drop.
    pub fn take_jwt_secret(&mut self) -> Option<Zeroizing<String>> {
        self.jwt_secret.take().map(Zeroizing::new)
    }
}
