//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/schema.sql` exactly. When the SQL
//! changes, regenerate them with `diesel print-schema` or edit by hand.

diesel::table! {
    /// Courses authored by instructors.
    courses (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Text,
        /// Identity-service user id of the author.
        instructor_id -> Varchar,
        price -> Numeric,
        /// One of `PENDING`, `PUBLISHED`, `DELETED`.
        status -> Varchar,
        /// Running mean of learner ratings, `0.0` when unrated.
        rating -> Float8,
        rating_count -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        /// Optimistic concurrency marker, bumped by every write.
        version -> Int4,
    }
}

diesel::table! {
    /// Category tree; `parent_id` points at the parent row.
    categories (id) {
        id -> Uuid,
        name -> Varchar,
        /// One of `INACTIVE`, `ACTIVE`, `DELETED`.
        status -> Varchar,
        parent_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Ordered course-to-category links.
    course_categories (course_id, category_id) {
        course_id -> Uuid,
        category_id -> Uuid,
        /// Order in which the author listed the category.
        position -> Int4,
    }
}

diesel::joinable!(course_categories -> courses (course_id));
diesel::joinable!(course_categories -> categories (category_id));

diesel::allow_tables_to_appear_in_same_query!(courses, categories, course_categories);
