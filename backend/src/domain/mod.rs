//! Domain primitives, aggregates and services.
//!
//! Purpose: model courses, categories, ratings and callers independently of
//! HTTP, AMQP or SQL. Inbound adapters drive the services through the
//! command/query ports in [`ports`]; outbound adapters implement the
//! repository and identity ports.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Course, Category, RatingSummary: aggregates and their invariants.
//! - CourseService, CategoryService, RatingAggregator: port implementations.
//! - IdentityResolver: breaker-guarded profile lookup with a fixed fallback.

pub mod authorization;
pub mod category;
pub mod category_service;
pub mod circuit_breaker;
pub mod course;
pub mod course_service;
pub mod error;
pub mod identifiers;
pub mod identity_resolver;
pub mod ports;
pub mod principal;
pub mod rating;
pub mod rating_aggregator;
pub mod trace_id;

pub use self::authorization::{ensure_owner_or_admin, is_owner_or_admin};
pub use self::category::{Category, CategoryStatus, CategoryTree};
pub use self::category_service::{CategoryCache, CategoryService};
pub use self::circuit_breaker::{CircuitBreakerConfig, CircuitState};
pub use self::course::{Course, CourseChanges, CourseDraft, CourseStatus, Price};
pub use self::course_service::{CatalogueConfig, CourseService};
pub use self::error::{Error, ErrorCode};
pub use self::identifiers::{CategoryId, CourseId};
pub use self::identity_resolver::{IdentityResolver, InstructorProfile};
pub use self::principal::{ForwardedCredential, Principal, RequestContext, Role, UserId};
pub use self::rating::{RatingEvent, RatingEventKind, RatingSummary, RatingValue};
pub use self::rating_aggregator::{RatingAggregator, RetryPolicy};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient result alias for domain operations.
pub type ApiResult<T> = Result<T, Error>;
