//! Caller profile lookup with a circuit breaker and a fixed fallback.
//!
//! Listing and detail reads attach the caller's profile to every course. The
//! identity service being down must never fail those reads, so
//! [`IdentityResolver::resolve_self`] always yields a profile: the real one
//! or [`InstructorProfile::unreachable`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::circuit_breaker::{Admission, CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::ports::IdentityDirectory;
use super::RequestContext;

/// Placeholder message served while the identity service is unavailable.
pub const UNREACHABLE_MESSAGE: &str = "Author info is currently unreachable.";

/// Profile returned by the identity service.
///
/// Only `id` is interpreted; every other field is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructorProfile {
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl InstructorProfile {
    /// Fallback served when the lookup fails or is short-circuited.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            id: None,
            message: Some(UNREACHABLE_MESSAGE.to_owned()),
            attributes: Map::new(),
        }
    }

    /// Minimal profile carrying only an id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Whether this is the fallback placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.is_none() && self.message.as_deref() == Some(UNREACHABLE_MESSAGE)
    }
}

/// Resolves the caller's profile through an [`IdentityDirectory`].
pub struct IdentityResolver {
    directory: Arc<dyn IdentityDirectory>,
    clock: Arc<dyn Clock>,
    breaker: Mutex<CircuitBreaker>,
}

impl IdentityResolver {
    /// Build a resolver with a closed breaker.
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        clock: Arc<dyn Clock>,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        Self {
            directory,
            clock,
            breaker: Mutex::new(CircuitBreaker::new(breaker)),
        }
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        // The breaker holds plain data; a panic mid-update leaves it usable.
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current breaker state.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker().state()
    }

    /// Caller's profile, or the placeholder when the lookup is impossible or
    /// fails.
    ///
    /// Anonymous callers carry no credential to forward and get the
    /// placeholder without a round trip.
    pub async fn resolve_self(&self, ctx: &RequestContext) -> InstructorProfile {
        let Some(credential) = ctx.credential() else {
            return InstructorProfile::unreachable();
        };

        let admission = self.breaker().admit(self.clock.utc());
        if admission == Admission::ShortCircuited {
            debug!("identity circuit open, serving placeholder profile");
            return InstructorProfile::unreachable();
        }

        let call = AdmittedCall {
            resolver: self,
            settled: false,
        };
        let outcome = self.directory.fetch_self(credential).await;
        call.settle();

        match outcome {
            Ok(profile) => {
                self.breaker().record_success();
                profile
            }
            Err(error) => {
                let now = self.clock.utc();
                let state = {
                    let mut breaker = self.breaker();
                    breaker.record_failure(now);
                    breaker.state()
                };
                warn!(%error, circuit = ?state, "identity lookup failed, serving placeholder profile");
                InstructorProfile::unreachable()
            }
        }
    }
}

/// Admitted upstream call. Dropped unsettled when the request future is
/// cancelled mid-call, which releases a half-open trial slot.
struct AdmittedCall<'a> {
    resolver: &'a IdentityResolver,
    settled: bool,
}

impl AdmittedCall<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for AdmittedCall<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let now = self.resolver.clock.utc();
        self.resolver.breaker().record_abandoned(now);
        debug!("identity lookup cancelled before completion");
    }
}
