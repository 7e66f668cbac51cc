//! Driving port for category administration.

use async_trait::async_trait;

use crate::domain::{CategoryTree, Error, RequestContext};

/// New category input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_id: Option<String>,
}

/// Category changes. Blank names and absent parents leave fields untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub parent_id: Option<String>,
}

/// Driving port for category mutations. Every operation requires ADMIN.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryCommand: Send + Sync {
    /// Create an INACTIVE category, optionally under an active parent.
    async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateCategoryRequest,
    ) -> Result<CategoryTree, Error>;

    /// Rename or re-parent an active category.
    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateCategoryRequest,
    ) -> Result<CategoryTree, Error>;

    /// INACTIVE to ACTIVE; no-op when already active.
    async fn activate(&self, ctx: &RequestContext, id: &str) -> Result<(), Error>;

    /// ACTIVE to INACTIVE; no-op when already inactive.
    async fn deactivate(&self, ctx: &RequestContext, id: &str) -> Result<(), Error>;

    /// Soft delete; no-op when already deleted.
    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), Error>;
}
