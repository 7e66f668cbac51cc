//! Wire payload for rating deliveries and the acknowledgement policy.

use serde::Deserialize;

use crate::domain::ports::RatingOutcome;
use crate::domain::{Error, ErrorCode, RatingEvent, RatingEventKind};

/// Body published by the review service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingMessage {
    pub course_id: String,
    pub rating: f64,
}

impl RatingMessage {
    /// Decode a delivery body.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Pair the payload with the kind implied by its queue.
    #[must_use]
    pub fn into_event(self, kind: RatingEventKind) -> RatingEvent {
        RatingEvent {
            course_id: self.course_id,
            rating: self.rating,
            kind,
        }
    }
}

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Applied or deliberately skipped.
    Ack,
    /// Will never succeed; drop it (or dead-letter, if the broker is set up to).
    Reject,
    /// May succeed later; put it back on the queue.
    Requeue,
}

impl Disposition {
    /// Decide from the handler's result.
    #[must_use]
    pub const fn for_result(result: &Result<RatingOutcome, Error>) -> Self {
        match result {
            Ok(_) => Self::Ack,
            Err(err) => Self::for_code(err.code()),
        }
    }

    const fn for_code(code: ErrorCode) -> Self {
        if code.is_transient() {
            Self::Requeue
        } else {
            Self::Reject
        }
    }
}
