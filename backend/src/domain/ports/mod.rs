//! Domain ports.
//!
//! Driven ports (`*Repository`, [`IdentityDirectory`]) are implemented by
//! outbound adapters. Driving ports (`*Command`, `*Query`,
//! [`RatingEventHandler`]) are implemented by domain services and called by
//! inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod category_command;
mod category_query;
mod category_repository;
mod course_command;
mod course_query;
mod course_repository;
mod identity_directory;
mod rating_events;

pub use category_command::{CategoryCommand, CreateCategoryRequest, UpdateCategoryRequest};
pub use category_query::CategoryQuery;
pub use category_repository::{CategoryRepository, CategoryRepositoryError};
pub use course_command::{CourseCommand, CreateCourseRequest, UpdateCourseRequest};
pub use course_query::{CourseQuery, CourseView};
pub use course_repository::{
    CourseCriterion, CourseListQuery, CourseRepository, CourseRepositoryError,
};
pub use identity_directory::{
    FixtureIdentityDirectory, IdentityDirectory, IdentityDirectoryError, UpstreamFailure,
};
pub use rating_events::{RatingEventHandler, RatingOutcome};

#[cfg(test)]
pub use category_command::MockCategoryCommand;
#[cfg(test)]
pub use category_query::MockCategoryQuery;
#[cfg(test)]
pub use category_repository::MockCategoryRepository;
#[cfg(test)]
pub use course_command::MockCourseCommand;
#[cfg(test)]
pub use course_query::MockCourseQuery;
#[cfg(test)]
pub use course_repository::MockCourseRepository;
#[cfg(test)]
pub use identity_directory::MockIdentityDirectory;
#[cfg(test)]
pub use rating_events::MockRatingEventHandler;
