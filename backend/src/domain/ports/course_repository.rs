//! Port for course persistence.
//!
//! Writes are optimistic: [`CourseRepository::update`] succeeds only when the
//! stored `version` still equals the version the caller read. Callers bump
//! `course.version` themselves before saving.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CategoryId, Course, CourseId, CourseStatus, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by course repository adapters.
    pub enum CourseRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            ServiceUnavailable, "course repository unavailable: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            InternalError, "course repository error: {message}",
        /// Another writer saved the course first.
        VersionConflict { expected: u32, actual: u32 } =>
            Conflict, "course was modified concurrently (expected version {expected}, found {actual})",
        /// The course row disappeared between read and write.
        Missing { course_id: String } =>
            NotFound, "Course with id {course_id} not found",
    }
}

/// Row filter for course listings.
#[derive(Debug, Clone, PartialEq)]
pub enum CourseCriterion {
    /// No filter beyond status.
    Any,
    /// Courses authored by this instructor.
    Instructor(UserId),
    /// Courses tagged with this category.
    Category(CategoryId),
    /// Case-insensitive substring over title or description.
    Keyword(String),
    /// Mean rating strictly above the threshold.
    RatedAbove(f64),
    /// Created strictly after the cutoff.
    CreatedAfter(DateTime<Utc>),
}

/// Listing request: a criterion plus the statuses to include.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseListQuery {
    pub criterion: CourseCriterion,
    pub statuses: Vec<CourseStatus>,
}

impl CourseListQuery {
    /// Restrict `criterion` to published courses.
    #[must_use]
    pub fn published(criterion: CourseCriterion) -> Self {
        Self {
            criterion,
            statuses: vec![CourseStatus::Published],
        }
    }

    /// Whether `course` satisfies this query. Adapters that cannot push the
    /// filter into storage use this as the reference behaviour.
    #[must_use]
    pub fn matches(&self, course: &Course) -> bool {
        if !self.statuses.contains(&course.status) {
            return false;
        }
        match &self.criterion {
            CourseCriterion::Any => true,
            CourseCriterion::Instructor(id) => &course.instructor_id == id,
            CourseCriterion::Category(id) => course.category_ids.contains(id),
            CourseCriterion::Keyword(keyword) => {
                let needle = keyword.to_lowercase();
                course.title.to_lowercase().contains(&needle)
                    || course.description.to_lowercase().contains(&needle)
            }
            CourseCriterion::RatedAbove(threshold) => course.rating.mean > *threshold,
            CourseCriterion::CreatedAfter(cutoff) => course.created_at > *cutoff,
        }
    }
}

/// Port for course storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch a course whose status is one of `statuses`.
    async fn find(
        &self,
        id: &CourseId,
        statuses: &[CourseStatus],
    ) -> Result<Option<Course>, CourseRepositoryError>;

    /// Whether a course with one of `statuses` exists.
    async fn exists(
        &self,
        id: &CourseId,
        statuses: &[CourseStatus],
    ) -> Result<bool, CourseRepositoryError>;

    /// List courses newest first.
    async fn list(&self, query: &CourseListQuery) -> Result<Vec<Course>, CourseRepositoryError>;

    /// Insert a new course together with its category links.
    async fn insert(&self, course: &Course) -> Result<(), CourseRepositoryError>;

    /// Overwrite a course if its stored version equals `expected_version`.
    ///
    /// Fails with [`CourseRepositoryError::VersionConflict`] otherwise.
    async fn update(
        &self,
        course: &Course,
        expected_version: u32,
    ) -> Result<(), CourseRepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CourseDraft, RatingSummary};
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;

    #[fixture]
    fn course() -> Course {
        let draft = CourseDraft::try_new(
            "Async Rust",
            "Futures, pinning and executors",
            Decimal::ONE,
            &["c".to_owned()],
        )
        .expect("valid draft");
        let mut course = Course::new_pending(
            draft,
            UserId::new("inst-1").expect("id"),
            vec![],
            Utc::now(),
        );
        course.status = CourseStatus::Published;
        course.rating = RatingSummary {
            mean: 4.6,
            count: 5,
        };
        course
    }

    #[rstest]
    #[case::keyword_in_title(CourseCriterion::Keyword("ASYNC".to_owned()), true)]
    #[case::keyword_in_description(CourseCriterion::Keyword("pinning".to_owned()), true)]
    #[case::keyword_absent(CourseCriterion::Keyword("haskell".to_owned()), false)]
    #[case::popular(CourseCriterion::RatedAbove(4.5), true)]
    #[case::threshold_is_strict(CourseCriterion::RatedAbove(4.6), false)]
    #[case::other_instructor(CourseCriterion::Instructor(UserId::new("x").expect("id")), false)]
    fn criteria_match_in_memory(
        course: Course,
        #[case] criterion: CourseCriterion,
        #[case] expected: bool,
    ) {
        assert_eq!(CourseListQuery::published(criterion).matches(&course), expected);
    }

    #[rstest]
    fn status_filter_applies_before_criterion(mut course: Course) {
        course.status = CourseStatus::Deleted;
        assert!(!CourseListQuery::published(CourseCriterion::Any).matches(&course));
    }

    #[rstest]
    fn version_conflict_formats_both_versions() {
        let message = CourseRepositoryError::version_conflict(2_u32, 3_u32).to_string();
        assert!(message.contains("expected 2"));
        assert!(message.contains("found 3"));
    }
}
