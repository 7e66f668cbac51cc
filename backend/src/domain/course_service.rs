//! Course lifecycle and catalogue queries.
//!
//! Every write goes through the repository's version check, so a lifecycle
//! change racing a rating update fails with `Conflict` instead of silently
//! discarding the other writer's fields.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::info;

use super::authorization::{ensure_owner_or_admin, is_owner_or_admin};
use super::category_service::CategoryService;
use super::course::{Course, CourseChanges, CourseDraft, CourseStatus};
use super::identity_resolver::IdentityResolver;
use super::ports::{
    CourseCommand, CourseCriterion, CourseListQuery, CourseQuery, CourseRepository,
    CourseRepositoryError, CourseView, CreateCourseRequest, UpdateCourseRequest,
};
use super::{CategoryId, CourseId, Error, RequestContext, Role};

/// Roles allowed to author courses.
pub const AUTHOR_ROLES: [Role; 2] = [Role::Instructor, Role::Admin];

const EDITABLE: [CourseStatus; 2] = [CourseStatus::Pending, CourseStatus::Published];

/// Tunables for catalogue queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogueConfig {
    /// `popular` lists courses rated strictly above this mean.
    pub popular_threshold: f64,
    /// `recent` lists courses created within this many days.
    pub recent_days: u32,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            popular_threshold: 4.5,
            recent_days: 10,
        }
    }
}

pub(crate) fn map_course_repository_error(error: CourseRepositoryError) -> Error {
    error.into_domain()
}

/// Course service implementing [`CourseCommand`] and [`CourseQuery`].
#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    categories: Arc<CategoryService>,
    identity: Arc<IdentityResolver>,
    clock: Arc<dyn Clock>,
    config: CatalogueConfig,
}

impl CourseService {
    /// Wire the service.
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        categories: Arc<CategoryService>,
        identity: Arc<IdentityResolver>,
        clock: Arc<dyn Clock>,
        config: CatalogueConfig,
    ) -> Self {
        Self {
            courses,
            categories,
            identity,
            clock,
            config,
        }
    }

    async fn load(&self, raw_id: &str, statuses: &[CourseStatus]) -> Result<Course, Error> {
        let id = CourseId::parse_existing(raw_id)?;
        self.courses
            .find(&id, statuses)
            .await
            .map_err(map_course_repository_error)?
            .ok_or_else(|| Error::not_found(format!("Course with id {id} not found")))
    }

    async fn resolve_categories(&self, raw_ids: &[String]) -> Result<Vec<CategoryId>, Error> {
        let mut ids = Vec::with_capacity(raw_ids.len());
        for raw in raw_ids {
            ids.push(self.categories.resolve_active(raw).await?.id);
        }
        Ok(ids)
    }

    async fn save(&self, mut course: Course) -> Result<Course, Error> {
        let expected = course.version;
        course.version = expected.saturating_add(1);
        self.courses
            .update(&course, expected)
            .await
            .map_err(map_course_repository_error)?;
        Ok(course)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        query: CourseListQuery,
    ) -> Result<Vec<CourseView>, Error> {
        let courses = self
            .courses
            .list(&query)
            .await
            .map_err(map_course_repository_error)?;
        self.present(ctx, courses).await
    }

    /// Render courses, resolving the caller's profile once for the batch.
    async fn present(
        &self,
        ctx: &RequestContext,
        courses: Vec<Course>,
    ) -> Result<Vec<CourseView>, Error> {
        if courses.is_empty() {
            return Ok(Vec::new());
        }
        let instructor = self.identity.resolve_self(ctx).await;
        let mut cache = self.categories.cache();
        let mut views = Vec::with_capacity(courses.len());
        for course in courses {
            let categories = cache.trees(&course.category_ids).await?;
            views.push(CourseView::new(course, categories, instructor.clone()));
        }
        Ok(views)
    }

    async fn present_one(&self, ctx: &RequestContext, course: Course) -> Result<CourseView, Error> {
        self.present(ctx, vec![course])
            .await?
            .pop()
            .ok_or_else(|| Error::internal("course rendering produced no view"))
    }
}

#[async_trait]
impl CourseCommand for CourseService {
    async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateCourseRequest,
    ) -> Result<CourseView, Error> {
        let principal = ctx.require_role(&AUTHOR_ROLES)?;
        let draft = CourseDraft::try_new(
            &request.title,
            &request.description,
            request.price,
            &request.category_ids,
        )?;
        let category_ids = self.resolve_categories(&draft.category_ids).await?;
        let course = Course::new_pending(
            draft,
            principal.id().clone(),
            category_ids,
            self.clock.utc(),
        );
        self.courses
            .insert(&course)
            .await
            .map_err(map_course_repository_error)?;
        info!(course_id = %course.id, instructor = %course.instructor_id, "course created");
        self.present_one(ctx, course).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateCourseRequest,
    ) -> Result<CourseView, Error> {
        let principal = ctx.require_role(&AUTHOR_ROLES)?;
        let changes = CourseChanges::try_new(
            request.title.as_deref(),
            request.description.as_deref(),
            request.price,
            request.category_ids.as_deref(),
        )?;
        let mut course = self.load(id, &EDITABLE).await?;
        ensure_owner_or_admin(&course.instructor_id, principal)?;
        let category_ids = match changes.category_ids.as_deref() {
            Some(raw) => Some(self.resolve_categories(raw).await?),
            None => None,
        };
        course.apply_changes(changes, category_ids, self.clock.utc());
        let course = self.save(course).await?;
        info!(course_id = %course.id, version = course.version, "course updated");
        self.present_one(ctx, course).await
    }

    async fn publish(&self, ctx: &RequestContext, id: &str) -> Result<(), Error> {
        let principal = ctx.require_role(&AUTHOR_ROLES)?;
        let mut course = self.load(id, &[CourseStatus::Pending]).await?;
        ensure_owner_or_admin(&course.instructor_id, principal)?;
        course.transition(CourseStatus::Published, self.clock.utc())?;
        let course = self.save(course).await?;
        info!(course_id = %course.id, "course published");
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<(), Error> {
        let principal = ctx.require_role(&AUTHOR_ROLES)?;
        let mut course = self.load(id, &[CourseStatus::Published]).await?;
        ensure_owner_or_admin(&course.instructor_id, principal)?;
        course.transition(CourseStatus::Deleted, self.clock.utc())?;
        let course = self.save(course).await?;
        info!(course_id = %course.id, "course soft-deleted");
        Ok(())
    }
}

#[async_trait]
impl CourseQuery for CourseService {
    async fn published(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error> {
        self.list(ctx, CourseListQuery::published(CourseCriterion::Any))
            .await
    }

    async fn mine(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error> {
        let principal = ctx.require_role(&AUTHOR_ROLES)?;
        let query = CourseListQuery {
            criterion: CourseCriterion::Instructor(principal.id().clone()),
            statuses: EDITABLE.to_vec(),
        };
        self.list(ctx, query).await
    }

    async fn mine_by_id(&self, ctx: &RequestContext, id: &str) -> Result<CourseView, Error> {
        let principal = ctx.require_role(&AUTHOR_ROLES)?;
        let course = self.load(id, &[CourseStatus::Published]).await?;
        ensure_owner_or_admin(&course.instructor_id, principal)?;
        self.present_one(ctx, course).await
    }

    async fn by_category(
        &self,
        ctx: &RequestContext,
        category_id: &str,
    ) -> Result<Vec<CourseView>, Error> {
        let category = self.categories.resolve_active(category_id).await?;
        self.list(
            ctx,
            CourseListQuery::published(CourseCriterion::Category(category.id)),
        )
        .await
    }

    async fn search(&self, ctx: &RequestContext, keyword: &str) -> Result<Vec<CourseView>, Error> {
        let keyword = keyword.trim();
        let criterion = if keyword.is_empty() {
            CourseCriterion::Any
        } else {
            CourseCriterion::Keyword(keyword.to_owned())
        };
        self.list(ctx, CourseListQuery::published(criterion)).await
    }

    async fn popular(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error> {
        let criterion = CourseCriterion::RatedAbove(self.config.popular_threshold);
        self.list(ctx, CourseListQuery::published(criterion)).await
    }

    async fn recent(&self, ctx: &RequestContext) -> Result<Vec<CourseView>, Error> {
        let cutoff = self.clock.utc() - Duration::days(i64::from(self.config.recent_days));
        let criterion = CourseCriterion::CreatedAfter(cutoff);
        self.list(ctx, CourseListQuery::published(criterion)).await
    }

    async fn exists_published(&self, id: &str) -> Result<bool, Error> {
        let Ok(id) = id.trim().parse::<CourseId>() else {
            return Ok(false);
        };
        self.courses
            .exists(&id, &[CourseStatus::Published])
            .await
            .map_err(map_course_repository_error)
    }

    async fn is_owner(&self, ctx: &RequestContext, id: &str) -> Result<bool, Error> {
        let principal = ctx.require_principal()?;
        let course = self.load(id, &EDITABLE).await?;
        Ok(is_owner_or_admin(&course.instructor_id, principal))
    }
}

#[cfg(test)]
#[path = "course_service_tests.rs"]
mod tests;
