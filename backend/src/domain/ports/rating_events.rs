//! Driving port for broker-delivered rating changes.

use async_trait::async_trait;

use crate::domain::{CourseId, Error, RatingEvent, RatingSummary};

/// What happened to an event that did not fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingOutcome {
    /// The course now carries `summary`.
    Applied {
        course_id: CourseId,
        summary: RatingSummary,
    },
    /// The event could not apply (removal from an empty summary) and was
    /// dropped without mutating anything.
    Skipped { course_id: CourseId },
}

/// Driving port for rating aggregation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingEventHandler: Send + Sync {
    /// Fold one event into the course's running mean.
    async fn handle(&self, event: RatingEvent) -> Result<RatingOutcome, Error>;
}
