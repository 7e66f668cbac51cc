//! Port for looking up the caller's profile in the identity service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{Error, ForwardedCredential, InstructorProfile};

use super::define_port_error;

/// Non-2xx answer from the identity service, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamFailure {
    /// Upstream `Date` header, empty when absent.
    pub timestamp: String,
    pub status: u16,
    pub reason_phrase: String,
    pub body: String,
    pub request_url: String,
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} from {}",
            self.status, self.reason_phrase, self.request_url
        )
    }
}

define_port_error! {
    /// Errors raised by identity directory adapters.
    pub enum IdentityDirectoryError {
        /// The identity service answered 404.
        NotFound { failure: UpstreamFailure } =>
            NotFound, "identity record not found: {failure}",
        /// The identity service answered with another non-2xx status.
        Upstream { failure: UpstreamFailure } =>
            UpstreamFailure, "identity service failed: {failure}",
        /// The request never produced a response.
        Transport { message: String } =>
            ServiceUnavailable, "identity service unreachable: {message}",
        /// A 2xx body could not be decoded.
        Decode { message: String } =>
            UpstreamFailure, "identity response could not be decoded: {message}",
    }
}

impl From<IdentityDirectoryError> for Error {
    fn from(value: IdentityDirectoryError) -> Self {
        let failure = match &value {
            IdentityDirectoryError::NotFound { failure }
            | IdentityDirectoryError::Upstream { failure } => Some(json!(failure)),
            IdentityDirectoryError::Transport { .. } | IdentityDirectoryError::Decode { .. } => None,
        };
        let error = value.into_domain();
        match failure {
            Some(details) => error.with_details(details),
            None => error,
        }
    }
}

/// Port for the identity service's "who am I" lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Fetch the profile of whoever `credential` belongs to.
    async fn fetch_self(
        &self,
        credential: &ForwardedCredential,
    ) -> Result<InstructorProfile, IdentityDirectoryError>;
}

/// Directory that answers every lookup with a fixed profile.
///
/// Used when no identity service is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureIdentityDirectory {
    profile: InstructorProfile,
}

impl FixtureIdentityDirectory {
    /// Answer every lookup with `profile`.
    #[must_use]
    pub const fn new(profile: InstructorProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl IdentityDirectory for FixtureIdentityDirectory {
    async fn fetch_self(
        &self,
        _credential: &ForwardedCredential,
    ) -> Result<InstructorProfile, IdentityDirectoryError> {
        Ok(self.profile.clone())
    }
}
