//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the course and category repository ports,
//! backed by PostgreSQL via `diesel-async` and a `bb8` connection pool.
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. No business logic resides here.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Optimistic writes**: course updates are conditioned on the stored
//!   `version` column.
//!
//! # Example
//!
//! ```ignore
//! use course_service::outbound::persistence::{DbPool, DieselCourseRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/courses")).await?;
//! let courses = DieselCourseRepository::new(pool);
//! ```

mod diesel_category_repository;
mod diesel_course_repository;
pub(crate) mod diesel_helpers;
mod models;
mod pool;
mod schema;

pub use diesel_category_repository::DieselCategoryRepository;
pub use diesel_course_repository::DieselCourseRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
