//! PostgreSQL-backed `CourseRepository` implementation using Diesel ORM.
//!
//! Course rows and their ordered category links are written in one
//! transaction. Updates are conditioned on the stored `version`; a zero-row
//! update is disambiguated into a version conflict or a missing course.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    CourseCriterion, CourseListQuery, CourseRepository, CourseRepositoryError,
};
use crate::domain::{
    CategoryId, Course, CourseId, CourseStatus, Price, RatingSummary, UserId,
};

use super::diesel_helpers::{
    classify_diesel_error, collect_rows, contains_pattern, counter_for_db, counter_from_db,
    map_pool_error_message,
};
use super::models::{CourseCategoryRow, CourseRow, CourseUpdate, NewCourseRow};
use super::pool::{DbPool, PoolError};
use super::schema::{course_categories, courses};

/// Diesel-backed implementation of the `CourseRepository` port.
#[derive(Clone)]
pub struct DieselCourseRepository {
    pool: DbPool,
}

impl DieselCourseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CourseRepositoryError {
    CourseRepositoryError::connection(map_pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error) -> CourseRepositoryError {
    match classify_diesel_error(error, "course") {
        Ok(message) => CourseRepositoryError::query(message),
        Err(message) => CourseRepositoryError::connection(message),
    }
}

fn status_values(statuses: &[CourseStatus]) -> Vec<&'static str> {
    statuses.iter().map(|status| status.as_str()).collect()
}

/// Convert a row plus its ordered links into the domain aggregate.
fn row_to_course(row: CourseRow, category_ids: Vec<CategoryId>) -> Result<Course, String> {
    let status = row
        .status
        .parse::<CourseStatus>()
        .map_err(|err| err.to_string())?;
    let instructor_id = UserId::new(&row.instructor_id).map_err(|err| err.to_string())?;
    let price = Price::new(row.price).map_err(|err| err.to_string())?;
    Ok(Course {
        id: CourseId::from_uuid(row.id),
        title: row.title,
        description: row.description,
        instructor_id,
        price,
        status,
        rating: RatingSummary {
            mean: row.rating,
            count: counter_from_db("rating_count", row.rating_count)?,
        },
        category_ids,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: counter_from_db("version", row.version)?,
    })
}

fn link_rows(course: &Course) -> Result<Vec<CourseCategoryRow>, String> {
    course
        .category_ids
        .iter()
        .enumerate()
        .map(|(index, category_id)| {
            let position = i32::try_from(index).map_err(|_| "too many category links".to_owned())?;
            Ok(CourseCategoryRow {
                course_id: *course.id.as_uuid(),
                category_id: *category_id.as_uuid(),
                position,
            })
        })
        .collect()
}

async fn load_links(
    conn: &mut AsyncPgConnection,
    course_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, Vec<CategoryId>>> {
    let rows: Vec<CourseCategoryRow> = course_categories::table
        .filter(course_categories::course_id.eq_any(course_ids))
        .select(CourseCategoryRow::as_select())
        .order_by((course_categories::course_id, course_categories::position))
        .load(conn)
        .await?;
    let mut links: HashMap<Uuid, Vec<CategoryId>> = HashMap::new();
    for row in rows {
        links
            .entry(row.course_id)
            .or_default()
            .push(CategoryId::from_uuid(row.category_id));
    }
    Ok(links)
}

fn attach_links(
    rows: Vec<CourseRow>,
    mut links: HashMap<Uuid, Vec<CategoryId>>,
) -> Result<Vec<Course>, CourseRepositoryError> {
    collect_rows(
        rows.into_iter().map(|row| {
            let category_ids = links.remove(&row.id).unwrap_or_default();
            row_to_course(row, category_ids)
        }),
        CourseRepositoryError::query,
    )
}

/// Outcome of the version-checked UPDATE inside its transaction.
enum UpdateOutcome {
    Applied,
    /// Zero rows matched; carries the stored version when the row exists.
    Stale(Option<i32>),
}

#[async_trait]
impl CourseRepository for DieselCourseRepository {
    async fn find(
        &self,
        id: &CourseId,
        statuses: &[CourseStatus],
    ) -> Result<Option<Course>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CourseRow> = courses::table
            .filter(courses::id.eq(id.as_uuid()))
            .filter(courses::status.eq_any(status_values(statuses)))
            .select(CourseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let links = load_links(&mut conn, &[row.id])
            .await
            .map_err(map_diesel_error)?;
        attach_links(vec![row], links).map(|mut found| found.pop())
    }

    async fn exists(
        &self,
        id: &CourseId,
        statuses: &[CourseStatus],
    ) -> Result<bool, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(diesel::dsl::exists(
            courses::table
                .filter(courses::id.eq(id.as_uuid()))
                .filter(courses::status.eq_any(status_values(statuses))),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn list(&self, query: &CourseListQuery) -> Result<Vec<Course>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut select = courses::table
            .filter(courses::status.eq_any(status_values(&query.statuses)))
            .select(CourseRow::as_select())
            .into_boxed();
        select = match &query.criterion {
            CourseCriterion::Any => select,
            CourseCriterion::Instructor(instructor) => {
                select.filter(courses::instructor_id.eq(instructor.as_str().to_owned()))
            }
            CourseCriterion::Category(category) => select.filter(
                courses::id.eq_any(
                    course_categories::table
                        .filter(course_categories::category_id.eq(*category.as_uuid()))
                        .select(course_categories::course_id),
                ),
            ),
            CourseCriterion::Keyword(keyword) => {
                let pattern = contains_pattern(keyword);
                select.filter(
                    courses::title
                        .ilike(pattern.clone())
                        .or(courses::description.ilike(pattern)),
                )
            }
            CourseCriterion::RatedAbove(threshold) => select.filter(courses::rating.gt(*threshold)),
            CourseCriterion::CreatedAfter(cutoff) => select.filter(courses::created_at.gt(*cutoff)),
        };

        let (rows, links) = conn
            .transaction(|conn| {
                async move {
                    let rows: Vec<CourseRow> = select
                        .order_by((courses::created_at.desc(), courses::id.asc()))
                        .load(conn)
                        .await?;
                    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
                    let links = load_links(conn, &ids).await?;
                    Ok::<_, diesel::result::Error>((rows, links))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        attach_links(rows, links)
    }

    async fn insert(&self, course: &Course) -> Result<(), CourseRepositoryError> {
        let links = link_rows(course).map_err(CourseRepositoryError::query)?;
        let new_row = NewCourseRow {
            id: *course.id.as_uuid(),
            title: &course.title,
            description: &course.description,
            instructor_id: course.instructor_id.as_str(),
            price: course.price.amount(),
            status: course.status.as_str(),
            rating: course.rating.mean,
            rating_count: counter_for_db("rating_count", course.rating.count)
                .map_err(CourseRepositoryError::query)?,
            created_at: course.created_at,
            updated_at: course.updated_at,
            version: counter_for_db("version", course.version)
                .map_err(CourseRepositoryError::query)?,
        };

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| {
            async move {
                diesel::insert_into(courses::table)
                    .values(&new_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(course_categories::table)
                    .values(&links)
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn update(
        &self,
        course: &Course,
        expected_version: u32,
    ) -> Result<(), CourseRepositoryError> {
        let links = link_rows(course).map_err(CourseRepositoryError::query)?;
        let expected = counter_for_db("version", expected_version)
            .map_err(CourseRepositoryError::query)?;
        let changes = CourseUpdate {
            title: &course.title,
            description: &course.description,
            price: course.price.amount(),
            status: course.status.as_str(),
            rating: course.rating.mean,
            rating_count: counter_for_db("rating_count", course.rating.count)
                .map_err(CourseRepositoryError::query)?,
            updated_at: course.updated_at,
            version: counter_for_db("version", course.version)
                .map_err(CourseRepositoryError::query)?,
        };
        let course_id = *course.id.as_uuid();

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let outcome = conn
            .transaction(|conn| {
                async move {
                    let updated = diesel::update(courses::table)
                        .filter(courses::id.eq(course_id))
                        .filter(courses::version.eq(expected))
                        .set(&changes)
                        .execute(conn)
                        .await?;
                    if updated == 0 {
                        let stored: Option<i32> = courses::table
                            .filter(courses::id.eq(course_id))
                            .select(courses::version)
                            .first(conn)
                            .await
                            .optional()?;
                        return Ok(UpdateOutcome::Stale(stored));
                    }
                    diesel::delete(
                        course_categories::table.filter(course_categories::course_id.eq(course_id)),
                    )
                    .execute(conn)
                    .await?;
                    diesel::insert_into(course_categories::table)
                        .values(&links)
                        .execute(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>(UpdateOutcome::Applied)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        match outcome {
            UpdateOutcome::Applied => Ok(()),
            UpdateOutcome::Stale(Some(actual)) => Err(CourseRepositoryError::version_conflict(
                expected_version,
                counter_from_db("version", actual).map_err(CourseRepositoryError::query)?,
            )),
            UpdateOutcome::Stale(None) => Err(CourseRepositoryError::missing(course.id.to_string())),
        }
    }
}
