//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod categories;
pub mod courses;
pub mod error;
pub mod health;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
