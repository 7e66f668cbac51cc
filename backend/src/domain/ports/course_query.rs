//! Driving port for course reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    CategoryTree, Course, CourseId, CourseStatus, Error, InstructorProfile, RequestContext,
};

/// Course as presented to callers: categories rendered as nested chains and
/// the instructor profile attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseView {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub instructor: InstructorProfile,
    pub price: Decimal,
    pub status: CourseStatus,
    pub rating: f64,
    pub rating_count: u32,
    pub categories: Vec<CategoryTree>,
    pub created_at: DateTime<Utc>,
}

impl CourseView {
    /// Combine a stored course with its rendered categories and profile.
    #[must_use]
    pub fn new(course: Course, categories: Vec<CategoryTree>, instructor: InstructorProfile) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            instructor,
            price: course.price.amount(),
            status: course.status,
            rating: course.rating.mean,
            rating_count: course.rating.count,
            categories,
            created_at: course.created_at,
        }
    }
}

/// Driving port for course queries.
///
/// Identifiers arrive as raw strings; unparseable ones behave like missing
/// courses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseQuery: Send + Sync {
    /// All published courses.
    async fn published(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error>;

    /// Courses authored by the caller.
    async fn mine(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error>;

    /// One published course the caller owns (or any, for admins).
    async fn mine_by_id(&self, ctx: &RequestContext, id: &str) -> Result<CourseView, Error>;

    /// Published courses in an active category.
    async fn by_category(
        &self,
        ctx: &RequestContext,
        category_id: &str,
    ) -> Result<Vec<CourseView>, Error>;

    /// Published courses whose title or description contains `keyword`.
    async fn search(&self, ctx: &RequestContext, keyword: &str) -> Result<Vec<CourseView>, Error>;

    /// Published courses rated above the configured threshold.
    async fn popular(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error>;

    /// Published courses created within the configured window.
    async fn recent(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error>;

    /// Whether `id` names a published course. Blank ids yield `false`.
    async fn exists_published(&self, id: &str) -> Result<bool, Error>;

    /// Whether the caller owns the pending or published course `id`.
    async fn is_owner(&self, ctx: &RequestContext, id: &str) -> Result<bool, Error>;
}
