//! Liveness and readiness probes.
//!
//! Readiness flips once the HTTP server is bound. Rating consumers report in
//! and out; when a broker is configured the service is only ready while every
//! expected consumer is attached, so a lost broker session shows up as 503.
//! A service without a broker expects no consumers and stays ready.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde_json::json;

/// Shared probe state.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    consumers: AtomicUsize,
    expected_consumers: AtomicUsize,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            consumers: AtomicUsize::new(0),
            expected_consumers: AtomicUsize::new(0),
        }
    }
}

impl HealthState {
    /// New state: live, not yet ready, no consumers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness so orchestrators drain the instance during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Require `count` attached consumers before reporting ready.
    pub fn expect_consumers(&self, count: usize) {
        self.expected_consumers.store(count, Ordering::Release);
    }

    /// Record a rating consumer attaching to its queue.
    pub fn consumer_started(&self) {
        self.consumers.fetch_add(1, Ordering::AcqRel);
    }

    /// Record a rating consumer detaching.
    pub fn consumer_stopped(&self) {
        let _ = self
            .consumers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Whether the server accepts traffic and every expected consumer is
    /// attached.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && self.consumers() >= self.expected_consumers()
    }

    /// Whether the process should be kept alive.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Number of attached rating consumers.
    pub fn consumers(&self) -> usize {
        self.consumers.load(Ordering::Acquire)
    }

    /// Number of consumers readiness waits for.
    pub fn expected_consumers(&self) -> usize {
        self.expected_consumers.load(Ordering::Acquire)
    }
}

fn probe_response(probe_ok: bool) -> actix_web::HttpResponseBuilder {
    let mut response = if probe_ok {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response.insert_header((header::CACHE_CONTROL, "no-store"));
    response
}

/// Readiness probe: 200 once bound with every expected consumer attached,
/// 503 otherwise.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    let ready = state.is_ready();
    probe_response(ready).json(json!({
        "ready": ready,
        "ratingConsumers": state.consumers(),
        "expectedRatingConsumers": state.expected_consumers(),
    }))
}

/// Liveness probe: 200 until [`HealthState::mark_unhealthy`] is called.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    probe_response(state.is_alive()).finish()
}
