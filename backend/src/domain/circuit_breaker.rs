//! Consecutive-failure circuit breaker.
//!
//! Closed until `failure_threshold` consecutive failures, then open for
//! `open_cooldown`. The first admission after the cool-down moves to half-open
//! and lets exactly one trial call through; its outcome closes or re-opens the
//! breaker. A trial that never reports back (the caller was cancelled) stops
//! blocking once another cool-down has passed, so the breaker cannot wedge in
//! half-open. The caller supplies `now` so tests drive time explicitly.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before a trial call, and how long an
    /// unreported trial may hold the half-open slot.
    pub open_cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_cooldown: Duration::from_secs(30),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are short-circuited.
    Open,
    /// A single trial call is in flight.
    HalfOpen,
}

/// Whether a call may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Make the call and report its outcome.
    Allowed,
    /// Skip the call and use the fallback.
    ShortCircuited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed { consecutive_failures: u32 },
    Open { since: DateTime<Utc> },
    HalfOpen { trial_started: DateTime<Utc> },
}

/// Breaker state machine. Wrap in a mutex to share between callers.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    phase: Phase,
}

impl CircuitBreaker {
    /// Closed breaker. A zero threshold is treated as one.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                open_cooldown: config.open_cooldown,
            },
            phase: Phase::Closed {
                consecutive_failures: 0,
            },
        }
    }

    /// Current state without side effects.
    #[must_use]
    pub const fn state(&self) -> CircuitState {
        match self.phase {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Decide whether a call may go out at `now`.
    pub fn admit(&mut self, now: DateTime<Utc>) -> Admission {
        let cooldown = self.config.open_cooldown;
        match self.phase {
            Phase::Closed { .. } => Admission::Allowed,
            Phase::Open { since } | Phase::HalfOpen { trial_started: since }
                if cooldown_elapsed(since, now, cooldown) =>
            {
                self.phase = Phase::HalfOpen { trial_started: now };
                Admission::Allowed
            }
            Phase::Open { .. } | Phase::HalfOpen { .. } => Admission::ShortCircuited,
        }
    }

    /// Report that an admitted call ended without an outcome.
    ///
    /// An abandoned trial re-opens the breaker; an abandoned call while closed
    /// says nothing about the upstream and is ignored.
    pub fn record_abandoned(&mut self, now: DateTime<Utc>) {
        if let Phase::HalfOpen { .. } = self.phase {
            self.phase = Phase::Open { since: now };
        }
    }

    /// Report a successful call.
    pub fn record_success(&mut self) {
        self.phase = Phase::Closed {
            consecutive_failures: 0,
        };
    }

    /// Report a failed call at `now`.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.phase = match self.phase {
            Phase::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures.saturating_add(1);
                if failures >= self.config.failure_threshold {
                    Phase::Open { since: now }
                } else {
                    Phase::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            Phase::HalfOpen { .. } | Phase::Open { .. } => Phase::Open { since: now },
        };
    }
}

fn cooldown_elapsed(since: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> bool {
    let Ok(cooldown) = chrono::Duration::from_std(cooldown) else {
        return false;
    };
    now.signed_duration_since(since) >= cooldown
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            open_cooldown: Duration::from_secs(10),
        })
    }

    #[rstest]
    fn opens_after_consecutive_failures(mut breaker: CircuitBreaker, t0: DateTime<Utc>) {
        breaker.record_failure(t0);
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure(t0);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.admit(t0), Admission::ShortCircuited);
    }

    #[rstest]
    fn success_resets_the_failure_streak(mut breaker: CircuitBreaker, t0: DateTime<Utc>) {
        breaker.record_failure(t0);
        breaker.record_success();
        breaker.record_failure(t0);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[rstest]
    fn half_open_admits_a_single_trial(mut breaker: CircuitBreaker, t0: DateTime<Utc>) {
        breaker.record_failure(t0);
        breaker.record_failure(t0);
        let later = t0 + chrono::Duration::seconds(10);
        assert_eq!(breaker.admit(later), Admission::Allowed);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.admit(later), Admission::ShortCircuited);
    }

    #[rstest]
    #[case::trial_succeeds(true, CircuitState::Closed)]
    #[case::trial_fails(false, CircuitState::Open)]
    fn trial_outcome_decides_next_state(
        mut breaker: CircuitBreaker,
        t0: DateTime<Utc>,
        #[case] succeeded: bool,
        #[case] expected: CircuitState,
    ) {
        breaker.record_failure(t0);
        breaker.record_failure(t0);
        let later = t0 + chrono::Duration::seconds(11);
        assert_eq!(breaker.admit(later), Admission::Allowed);
        if succeeded {
            breaker.record_success();
        } else {
            breaker.record_failure(later);
        }
        assert_eq!(breaker.state(), expected);
    }

    #[rstest]
    fn reopened_breaker_waits_a_fresh_cooldown(mut breaker: CircuitBreaker, t0: DateTime<Utc>) {
        breaker.record_failure(t0);
        breaker.record_failure(t0);
        let trial_at = t0 + chrono::Duration::seconds(10);
        breaker.admit(trial_at);
        breaker.record_failure(trial_at);
        let too_soon = trial_at + chrono::Duration::seconds(5);
        assert_eq!(breaker.admit(too_soon), Admission::ShortCircuited);
    }

    #[rstest]
    fn unreported_trial_is_readmitted_after_a_cooldown(
        mut breaker: CircuitBreaker,
        t0: DateTime<Utc>,
    ) {
        breaker.record_failure(t0);
        breaker.record_failure(t0);
        let trial_at = t0 + chrono::Duration::seconds(10);
        assert_eq!(breaker.admit(trial_at), Admission::Allowed);
        assert_eq!(
            breaker.admit(trial_at + chrono::Duration::seconds(9)),
            Admission::ShortCircuited
        );
        assert_eq!(
            breaker.admit(trial_at + chrono::Duration::seconds(10)),
            Admission::Allowed
        );
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[rstest]
    fn abandoned_trial_reopens_the_breaker(mut breaker: CircuitBreaker, t0: DateTime<Utc>) {
        breaker.record_failure(t0);
        breaker.record_failure(t0);
        let trial_at = t0 + chrono::Duration::seconds(10);
        breaker.admit(trial_at);
        breaker.record_abandoned(trial_at);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(
            breaker.admit(trial_at + chrono::Duration::seconds(10)),
            Admission::Allowed
        );
    }

    #[rstest]
    fn abandoned_call_while_closed_is_ignored(mut breaker: CircuitBreaker, t0: DateTime<Utc>) {
        breaker.record_failure(t0);
        breaker.record_abandoned(t0);
        breaker.record_failure(t0);
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
