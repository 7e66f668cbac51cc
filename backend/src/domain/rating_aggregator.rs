//! Folds rating-change events into a course's running mean.
//!
//! Deliveries are at-least-once and the ADD and REMOVE queues are consumed
//! concurrently, so two events for one course may race. Each attempt reads
//! `(rating, count, version)`, computes the new summary and writes it
//! conditioned on `version`; a lost race re-reads and tries again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use rand::Rng;
use tracing::{debug, info, warn};

use super::course_service::map_course_repository_error;
use super::ports::{CourseRepository, CourseRepositoryError, RatingEventHandler, RatingOutcome};
use super::rating::{RatingChange, RatingValue};
use super::{CourseId, CourseStatus, Error, RatingEvent};

/// Optimistic retry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up with `Conflict`.
    pub max_attempts: u32,
    /// Upper bound of the first jittered pause; later pauses scale linearly.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_backoff: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    /// Random pause in `[0, base_backoff * attempt]`.
    fn jittered_pause(&self, attempt: u32) -> Duration {
        let ceiling = self.base_backoff.saturating_mul(attempt);
        let ceiling_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling_ms))
    }
}

/// Rating aggregator over a versioned [`CourseRepository`].
#[derive(Clone)]
pub struct RatingAggregator {
    courses: Arc<dyn CourseRepository>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl RatingAggregator {
    /// Wire the aggregator.
    pub fn new(courses: Arc<dyn CourseRepository>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            courses,
            clock,
            retry,
        }
    }

    async fn attempt(
        &self,
        course_id: &CourseId,
        event: &RatingEvent,
        value: RatingValue,
    ) -> Result<RatingOutcome, CourseRepositoryError> {
        let Some(mut course) = self
            .courses
            .find(course_id, &[CourseStatus::Published])
            .await?
        else {
            return Err(CourseRepositoryError::missing(course_id.to_string()));
        };

        let summary = match course.rating.apply(event.kind, value) {
            RatingChange::Updated(summary) => summary,
            RatingChange::NothingToRemove => {
                warn!(
                    course_id = %course_id,
                    kind = ?event.kind,
                    "rating removal on a course with no ratings, skipping"
                );
                return Ok(RatingOutcome::Skipped {
                    course_id: *course_id,
                });
            }
        };

        let expected = course.version;
        course.rating = summary;
        course.version = expected.saturating_add(1);
        course.updated_at = self.clock.utc();
        self.courses.update(&course, expected).await?;
        Ok(RatingOutcome::Applied {
            course_id: *course_id,
            summary,
        })
    }
}

#[async_trait]
impl RatingEventHandler for RatingAggregator {
    async fn handle(&self, event: RatingEvent) -> Result<RatingOutcome, Error> {
        let value = RatingValue::new(event.rating)?;
        let course_id = CourseId::parse_existing(&event.course_id)?;
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.attempt(&course_id, &event, value).await {
                Ok(outcome) => {
                    if let RatingOutcome::Applied { summary, .. } = outcome {
                        info!(
                            course_id = %course_id,
                            kind = ?event.kind,
                            rating = summary.mean,
                            count = summary.count,
                            attempt,
                            "rating applied"
                        );
                    }
                    return Ok(outcome);
                }
                Err(CourseRepositoryError::VersionConflict { expected, actual })
                    if attempt < max_attempts =>
                {
                    let pause = self.retry.jittered_pause(attempt);
                    debug!(
                        course_id = %course_id,
                        attempt,
                        expected,
                        actual,
                        pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
                        "rating write lost a race, retrying"
                    );
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                }
                Err(CourseRepositoryError::VersionConflict { .. }) => {
                    warn!(course_id = %course_id, attempts = max_attempts, "rating retries exhausted");
                    return Err(Error::conflict(format!(
                        "rating update for course {course_id} lost {max_attempts} consecutive races"
                    )));
                }
                Err(other) => return Err(map_course_repository_error(other)),
            }
        }

        Err(Error::internal("rating retry loop ended without an outcome"))
    }
}
