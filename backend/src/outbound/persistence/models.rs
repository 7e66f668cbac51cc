//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::schema::{categories, course_categories, courses};

/// Row struct for reading from the courses table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor_id: String,
    pub price: Decimal,
    pub status: String,
    pub rating: f64,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// Insertable struct for creating course records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = courses)]
pub(crate) struct NewCourseRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub instructor_id: &'a str,
    pub price: Decimal,
    pub status: &'a str,
    pub rating: f64,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// Changeset for version-checked course updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = courses)]
pub(crate) struct CourseUpdate<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub price: Decimal,
    pub status: &'a str,
    pub rating: f64,
    pub rating_count: i32,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// Link row between a course and one of its categories.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = course_categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseCategoryRow {
    pub course_id: Uuid,
    pub category_id: Uuid,
    pub position: i32,
}

/// Row struct for the categories table; also used for inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset for category updates. A `None` parent clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = categories)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct CategoryUpdate<'a> {
    pub name: &'a str,
    pub status: &'a str,
    pub parent_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}
