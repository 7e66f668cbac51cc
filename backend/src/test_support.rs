//! In-memory adapters and clocks for unit and integration tests.
//!
//! Compiled for unit tests and, through the `test-support` feature, for the
//! integration tests under `tests/`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{
    CategoryRepository, CategoryRepositoryError, CourseListQuery, CourseRepository,
    CourseRepositoryError,
};
use crate::domain::{Category, CategoryId, CategoryStatus, Course, CourseId, CourseStatus};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock frozen at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward.
    ///
    /// # Panics
    ///
    /// Panics when `delta` does not fit a chrono duration.
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => panic!("duration out of range: {error}"),
        };
        *lock(&self.0) += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Versioned in-memory course store.
///
/// Honours the same optimistic version contract as the PostgreSQL adapter, so
/// concurrency tests exercise the real retry path.
#[derive(Clone, Default)]
pub struct InMemoryCourseRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
}

impl InMemoryCourseRepository {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `course` as-is, bypassing version checks.
    pub fn seed(&self, course: Course) {
        lock(&self.courses).insert(course.id, course);
    }

    /// Snapshot of one stored course.
    #[must_use]
    pub fn get(&self, id: &CourseId) -> Option<Course> {
        lock(&self.courses).get(id).cloned()
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn find(
        &self,
        id: &CourseId,
        statuses: &[CourseStatus],
    ) -> Result<Option<Course>, CourseRepositoryError> {
        Ok(lock(&self.courses)
            .get(id)
            .filter(|course| statuses.contains(&course.status))
            .cloned())
    }

    async fn exists(
        &self,
        id: &CourseId,
        statuses: &[CourseStatus],
    ) -> Result<bool, CourseRepositoryError> {
        Ok(lock(&self.courses)
            .get(id)
            .is_some_and(|course| statuses.contains(&course.status)))
    }

    async fn list(&self, query: &CourseListQuery) -> Result<Vec<Course>, CourseRepositoryError> {
        let mut courses: Vec<Course> = lock(&self.courses)
            .values()
            .filter(|course| query.matches(course))
            .cloned()
            .collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(courses)
    }

    async fn insert(&self, course: &Course) -> Result<(), CourseRepositoryError> {
        let mut courses = lock(&self.courses);
        if courses.contains_key(&course.id) {
            return Err(CourseRepositoryError::query(format!(
                "duplicate course id {}",
                course.id
            )));
        }
        courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn update(
        &self,
        course: &Course,
        expected_version: u32,
    ) -> Result<(), CourseRepositoryError> {
        let mut courses = lock(&self.courses);
        let stored = courses
            .get_mut(&course.id)
            .ok_or_else(|| CourseRepositoryError::missing(course.id.to_string()))?;
        if stored.version != expected_version {
            return Err(CourseRepositoryError::version_conflict(
                expected_version,
                stored.version,
            ));
        }
        *stored = course.clone();
        Ok(())
    }
}

/// In-memory category store.
#[derive(Clone, Default)]
pub struct InMemoryCategoryRepository {
    categories: Arc<Mutex<HashMap<CategoryId, Category>>>,
}

impl InMemoryCategoryRepository {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `category` as-is.
    pub fn seed(&self, category: Category) {
        lock(&self.categories).insert(category.id, category);
    }

    /// Snapshot of one stored category.
    #[must_use]
    pub fn get(&self, id: &CategoryId) -> Option<Category> {
        lock(&self.categories).get(id).cloned()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find(
        &self,
        id: &CategoryId,
    ) -> Result<Option<Category>, CategoryRepositoryError> {
        Ok(lock(&self.categories).get(id).cloned())
    }

    async fn list_by_status(
        &self,
        status: CategoryStatus,
    ) -> Result<Vec<Category>, CategoryRepositoryError> {
        let mut categories: Vec<Category> = lock(&self.categories)
            .values()
            .filter(|category| category.status == status)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert(&self, category: &Category) -> Result<(), CategoryRepositoryError> {
        lock(&self.categories).insert(category.id, category.clone());
        Ok(())
    }

    async fn update(&self, category: &Category) -> Result<(), CategoryRepositoryError> {
        let mut categories = lock(&self.categories);
        match categories.get_mut(&category.id) {
            Some(stored) => {
                *stored = category.clone();
                Ok(())
            }
            None => Err(CategoryRepositoryError::query(format!(
                "category {} does not exist",
                category.id
            ))),
        }
    }
}

/// ACTIVE category with an optional parent, stamped at the Unix epoch.
#[must_use]
pub fn active_category(name: &str, parent: Option<CategoryId>) -> Category {
    let mut category = Category::new_inactive(name.to_owned(), parent, DateTime::<Utc>::UNIX_EPOCH);
    category.status = CategoryStatus::Active;
    category
}
