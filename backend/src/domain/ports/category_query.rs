//! Driving port for category reads.

use async_trait::async_trait;

use crate::domain::{CategoryTree, Error};

/// Driving port for category queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryQuery: Send + Sync {
    /// Every active category with its parent chain.
    async fn list_active(&self) -> Result<Vec<CategoryTree>, Error>;

    /// One active category with its parent chain.
    async fn get_active(&self, id: &str) -> Result<CategoryTree, Error>;
}
