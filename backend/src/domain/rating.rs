//! Incremental mean arithmetic for course ratings.

use serde::Serialize;
use serde_json::json;

use super::Error;

/// Highest rating a learner can give.
pub const MAX_RATING: f64 = 5.0;

/// Direction of a rating change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingEventKind {
    /// A learner added a rating.
    Add,
    /// A learner withdrew a rating.
    Remove,
}

/// A single rating in `[0, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RatingValue(f64);

impl RatingValue {
    /// Validate a raw rating.
    pub fn new(raw: f64) -> Result<Self, Error> {
        if raw.is_finite() && (0.0..=MAX_RATING).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(
                Error::invalid_request(format!("rating {raw} is outside [0, {MAX_RATING}]"))
                    .with_details(json!({ "field": "rating" })),
            )
        }
    }

    /// Underlying value.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

/// Rating-change notification as delivered by the broker.
///
/// Fields are raw; the aggregator validates them.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingEvent {
    pub course_id: String,
    pub rating: f64,
    pub kind: RatingEventKind,
}

/// Running mean and contribution count.
///
/// ## Invariants
/// - `count == 0` implies `mean == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub mean: f64,
    pub count: u32,
}

/// Result of applying one event to a summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingChange {
    /// New summary to persist.
    Updated(RatingSummary),
    /// REMOVE against an empty summary; nothing to persist.
    NothingToRemove,
}

impl RatingSummary {
    /// Apply `kind` with `value` and return the resulting summary.
    #[must_use]
    pub fn apply(self, kind: RatingEventKind, value: RatingValue) -> RatingChange {
        let v = value.get();
        let n = f64::from(self.count);
        match kind {
            RatingEventKind::Add => RatingChange::Updated(Self {
                mean: clamp_mean((self.mean * n + v) / (n + 1.0)),
                count: self.count.saturating_add(1),
            }),
            RatingEventKind::Remove => match self.count {
                0 => RatingChange::NothingToRemove,
                1 => RatingChange::Updated(Self::default()),
                count => RatingChange::Updated(Self {
                    mean: clamp_mean((self.mean * n - v) / (n - 1.0)),
                    count: count - 1,
                }),
            },
        }
    }
}

fn clamp_mean(mean: f64) -> f64 {
    if mean.is_nan() {
        return 0.0;
    }
    mean.clamp(0.0, MAX_RATING)
}
