//! Port for category persistence.

use async_trait::async_trait;

use crate::domain::{Category, CategoryId, CategoryStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by category repository adapters.
    pub enum CategoryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            ServiceUnavailable, "category repository unavailable: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            InternalError, "category repository error: {message}",
    }
}

/// Port for category storage and retrieval.
///
/// Lookups return categories in any status; callers decide which statuses
/// are usable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Fetch one category.
    async fn find(&self, id: &CategoryId) -> Result<Option<Category>, CategoryRepositoryError>;

    /// All categories in `status`, ordered by name.
    async fn list_by_status(
        &self,
        status: CategoryStatus,
    ) -> Result<Vec<Category>, CategoryRepositoryError>;

    /// Insert a new category.
    async fn insert(&self, category: &Category) -> Result<(), CategoryRepositoryError>;

    /// Overwrite name, status and parent of an existing category.
    async fn update(&self, category: &Category) -> Result<(), CategoryRepositoryError>;
}
