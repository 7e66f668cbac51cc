//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use course_service::domain::ports::{
    CategoryRepository, CourseRepository, FixtureIdentityDirectory, IdentityDirectory,
};
use course_service::domain::{CatalogueConfig, CircuitBreakerConfig, RetryPolicy};
use course_service::inbound::http::auth::TokenVerifier;
use course_service::outbound::persistence::{
    DbPool, DieselCategoryRepository, DieselCourseRepository,
};

/// Driven repository ports shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub courses: Arc<dyn CourseRepository>,
    pub categories: Arc<dyn CategoryRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories over `pool`.
    pub fn diesel(pool: &DbPool) -> Self {
        Self {
            courses: Arc::new(DieselCourseRepository::new(pool.clone())),
            categories: Arc::new(DieselCategoryRepository::new(pool.clone())),
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) repositories: Repositories,
    pub(crate) tokens: Arc<TokenVerifier>,
    pub(crate) identity: Arc<dyn IdentityDirectory>,
    pub(crate) breaker: CircuitBreakerConfig,
    pub(crate) catalogue: CatalogueConfig,
    pub(crate) retry: RetryPolicy,
}

impl ServerConfig {
    /// Construct a server configuration with default tuning and a fixture
    /// identity directory.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        repositories: Repositories,
        tokens: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            bind_addr,
            repositories,
            tokens,
            identity: Arc::new(FixtureIdentityDirectory::default()),
            breaker: CircuitBreakerConfig::default(),
            catalogue: CatalogueConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Resolve instructor profiles through `directory`.
    #[must_use]
    pub fn with_identity(mut self, directory: Arc<dyn IdentityDirectory>) -> Self {
        self.identity = directory;
        self
    }

    /// Override the identity circuit breaker tuning.
    #[must_use]
    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Override the popular/recent listing tunables.
    #[must_use]
    pub fn with_catalogue(mut self, catalogue: CatalogueConfig) -> Self {
        self.catalogue = catalogue;
        self
    }

    /// Override the rating retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
