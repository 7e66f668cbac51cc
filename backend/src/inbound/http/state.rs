//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{CategoryCommand, CategoryQuery, CourseCommand, CourseQuery};

use super::auth::TokenVerifier;

/// Parameter object bundling the driving ports used by HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub courses: Arc<dyn CourseCommand>,
    pub courses_query: Arc<dyn CourseQuery>,
    pub categories: Arc<dyn CategoryCommand>,
    pub categories_query: Arc<dyn CategoryQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub courses: Arc<dyn CourseCommand>,
    pub courses_query: Arc<dyn CourseQuery>,
    pub categories: Arc<dyn CategoryCommand>,
    pub categories_query: Arc<dyn CategoryQuery>,
    pub tokens: Arc<TokenVerifier>,
}

impl HttpState {
    /// Construct state from the port bundle and the token verifier.
    pub fn new(ports: HttpStatePorts, tokens: Arc<TokenVerifier>) -> Self {
        let HttpStatePorts {
            courses,
            courses_query,
            categories,
            categories_query,
        } = ports;
        Self {
            courses,
            courses_query,
            categories,
            categories_query,
            tokens,
        }
    }
}
