//! Driving port for course mutations.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Error, RequestContext};

use super::CourseView;

/// Raw author input for a new course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category_ids: Vec<String>,
}

/// Raw partial update. `None` means the field was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_ids: Option<Vec<String>>,
}

/// Driving port for the course lifecycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseCommand: Send + Sync {
    /// Create a PENDING course owned by the caller.
    async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateCourseRequest,
    ) -> Result<CourseView, Error>;

    /// Partially update a pending or published course.
    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateCourseRequest,
    ) -> Result<CourseView, Error>;

    /// PENDING to PUBLISHED.
    async fn publish(&self, ctx: &RequestContext, id: &str) -> Result<(), Error>;

    /// PUBLISHED to DELETED.
    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), Error>;
}
