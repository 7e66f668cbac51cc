//! Course aggregate and the validation applied to author input.
//!
//! ```text
//! PENDING   --publish--> PUBLISHED
//! PUBLISHED --delete---> DELETED
//! ```
//!
//! Updates keep the current status. `DELETED` is terminal.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::rating::RatingSummary;
use super::{CategoryId, CourseId, Error, UserId};

/// Longest accepted title, in characters.
pub const TITLE_MAX_CHARS: usize = 150;
/// Longest accepted description, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
/// Most categories a course may belong to.
pub const MAX_CATEGORIES: usize = 3;
/// Characters refused in titles.
pub const FORBIDDEN_TITLE_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Lifecycle status of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    /// Created, not yet visible in public listings.
    Pending,
    /// Visible to learners.
    Published,
    /// Soft-deleted.
    Deleted,
}

impl CourseStatus {
    /// Storage spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Published => "PUBLISHED",
            Self::Deleted => "DELETED",
        }
    }

    /// Whether the lifecycle permits moving to `next`.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Published) | (Self::Published, Self::Deleted)
        )
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status value outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown course status `{0}`")]
pub struct UnknownCourseStatus(pub String);

impl FromStr for CourseStatus {
    type Err = UnknownCourseStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PUBLISHED" => Ok(Self::Published),
            "DELETED" => Ok(Self::Deleted),
            other => Err(UnknownCourseStatus(other.to_owned())),
        }
    }
}

/// Field-level validation failures for course input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseValidationError {
    /// Title blank after trimming.
    #[error("title must not be blank")]
    BlankTitle,
    /// Title longer than [`TITLE_MAX_CHARS`].
    #[error("title must be at most {TITLE_MAX_CHARS} characters")]
    TitleTooLong,
    /// Title contains a reserved character.
    #[error("title must not contain `{0}`")]
    TitleForbiddenChar(char),
    /// Description blank after trimming.
    #[error("description must not be blank")]
    BlankDescription,
    /// Description longer than [`DESCRIPTION_MAX_CHARS`].
    #[error("description must be at most {DESCRIPTION_MAX_CHARS} characters")]
    DescriptionTooLong,
    /// Negative price.
    #[error("price must not be negative")]
    NegativePrice,
    /// No categories supplied.
    #[error("at least one category is required")]
    NoCategories,
    /// More than [`MAX_CATEGORIES`] distinct categories.
    #[error("at most {MAX_CATEGORIES} categories are allowed")]
    TooManyCategories,
    /// A category id was blank.
    #[error("category ids must not be blank")]
    BlankCategoryId,
}

impl CourseValidationError {
    /// Name of the offending request field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::BlankTitle | Self::TitleTooLong | Self::TitleForbiddenChar(_) => "title",
            Self::BlankDescription | Self::DescriptionTooLong => "description",
            Self::NegativePrice => "price",
            Self::NoCategories | Self::TooManyCategories | Self::BlankCategoryId => "categories",
        }
    }
}

impl From<CourseValidationError> for Error {
    fn from(value: CourseValidationError) -> Self {
        Self::invalid_request(value.to_string()).with_details(json!({
            "field": value.field(),
            "code": "invalid_course",
        }))
    }
}

/// Non-negative course price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Validate a price.
    pub fn new(amount: Decimal) -> Result<Self, CourseValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CourseValidationError::NegativePrice);
        }
        Ok(Self(amount))
    }

    /// Underlying amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }
}

fn validate_title(raw: &str) -> Result<String, CourseValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(CourseValidationError::BlankTitle);
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(CourseValidationError::TitleTooLong);
    }
    if let Some(bad) = title.chars().find(|c| FORBIDDEN_TITLE_CHARS.contains(c)) {
        return Err(CourseValidationError::TitleForbiddenChar(bad));
    }
    Ok(title.to_owned())
}

fn validate_description(raw: &str) -> Result<String, CourseValidationError> {
    let description = raw.trim();
    if description.is_empty() {
        return Err(CourseValidationError::BlankDescription);
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(CourseValidationError::DescriptionTooLong);
    }
    Ok(description.to_owned())
}

/// Trim, reject blanks and collapse duplicates while keeping first-seen order.
fn normalise_category_ids(raw: &[String]) -> Result<Vec<String>, CourseValidationError> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::with_capacity(raw.len());
    for id in raw {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(CourseValidationError::BlankCategoryId);
        }
        if seen.insert(trimmed.to_owned()) {
            ids.push(trimmed.to_owned());
        }
    }
    match ids.len() {
        0 => Err(CourseValidationError::NoCategories),
        n if n > MAX_CATEGORIES => Err(CourseValidationError::TooManyCategories),
        _ => Ok(ids),
    }
}

/// Validated input for a new course. Category ids are still unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub category_ids: Vec<String>,
}

impl CourseDraft {
    /// Validate raw author input.
    pub fn try_new(
        title: &str,
        description: &str,
        price: Decimal,
        category_ids: &[String],
    ) -> Result<Self, CourseValidationError> {
        Ok(Self {
            title: validate_title(title)?,
            description: validate_description(description)?,
            price: Price::new(price)?,
            category_ids: normalise_category_ids(category_ids)?,
        })
    }
}

/// Validated partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category_ids: Option<Vec<String>>,
}

impl CourseChanges {
    /// Validate raw partial input.
    ///
    /// Blank text and empty category lists count as absent; present values
    /// obey the same limits as creation.
    pub fn try_new(
        title: Option<&str>,
        description: Option<&str>,
        price: Option<Decimal>,
        category_ids: Option<&[String]>,
    ) -> Result<Self, CourseValidationError> {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .map(validate_title)
            .transpose()?;
        let description = description
            .filter(|d| !d.trim().is_empty())
            .map(validate_description)
            .transpose()?;
        let price = price.map(Price::new).transpose()?;
        let category_ids = category_ids
            .filter(|ids| !ids.is_empty())
            .map(normalise_category_ids)
            .transpose()?;
        Ok(Self {
            title,
            description,
            price,
            category_ids,
        })
    }
}

/// Persisted course.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub instructor_id: UserId,
    pub price: Price,
    pub status: CourseStatus,
    pub rating: RatingSummary,
    pub category_ids: Vec<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency marker; bumped by every persisted write.
    pub version: u32,
}

impl Course {
    /// Build a fresh PENDING course from a validated draft.
    #[must_use]
    pub fn new_pending(
        draft: CourseDraft,
        instructor_id: UserId,
        category_ids: Vec<CategoryId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CourseId::random(),
            title: draft.title,
            description: draft.description,
            instructor_id,
            price: draft.price,
            status: CourseStatus::Pending,
            rating: RatingSummary::default(),
            category_ids,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Apply validated changes. `category_ids` carries the resolved ids when
    /// the change set replaced the categories.
    pub fn apply_changes(
        &mut self,
        changes: CourseChanges,
        category_ids: Option<Vec<CategoryId>>,
        now: DateTime<Utc>,
    ) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(ids) = category_ids {
            self.category_ids = ids;
        }
        self.updated_at = now;
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: CourseStatus, now: DateTime<Utc>) -> Result<(), Error> {
        if !self.status.can_become(next) {
            return Err(Error::not_found(format!(
                "Course with id {} not found in status {}",
                self.id, self.status
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::{fixture, rstest};

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    #[fixture]
    fn draft() -> CourseDraft {
        CourseDraft::try_new("Rust 101", "Ownership and borrowing", Decimal::new(1999, 2), &ids(&["c1"]))
            .expect("valid draft")
    }

    #[rstest]
    #[case::blank("   ", CourseValidationError::BlankTitle)]
    #[case::slash("a/b", CourseValidationError::TitleForbiddenChar('/'))]
    #[case::pipe("a|b", CourseValidationError::TitleForbiddenChar('|'))]
    #[case::quote("say \"hi\"", CourseValidationError::TitleForbiddenChar('"'))]
    fn titles_are_validated(#[case] title: &str, #[case] expected: CourseValidationError) {
        let err = CourseDraft::try_new(title, "d", Decimal::ZERO, &ids(&["c1"])).expect_err("invalid");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn title_length_counts_characters_not_bytes() {
        let accented = "é".repeat(TITLE_MAX_CHARS);
        assert!(CourseDraft::try_new(&accented, "d", Decimal::ZERO, &ids(&["c1"])).is_ok());
        let too_long = "é".repeat(TITLE_MAX_CHARS + 1);
        assert_eq!(
            CourseDraft::try_new(&too_long, "d", Decimal::ZERO, &ids(&["c1"])),
            Err(CourseValidationError::TitleTooLong)
        );
    }

    #[rstest]
    #[case::none(&[], CourseValidationError::NoCategories)]
    #[case::four(&["a", "b", "c", "d"], CourseValidationError::TooManyCategories)]
    #[case::blank(&["a", " "], CourseValidationError::BlankCategoryId)]
    fn categories_are_bounded(#[case] raw: &[&str], #[case] expected: CourseValidationError) {
        let err = CourseDraft::try_new("t", "d", Decimal::ZERO, &ids(raw)).expect_err("invalid");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn duplicate_categories_collapse() {
        let draft = CourseDraft::try_new("t", "d", Decimal::ZERO, &ids(&["a", "b", "a", "c", "b"]))
            .expect("three distinct");
        assert_eq!(draft.category_ids, ids(&["a", "b", "c"]));
    }

    #[rstest]
    fn negative_price_is_rejected_but_zero_is_free() {
        assert_eq!(Price::new(Decimal::new(-1, 2)), Err(CourseValidationError::NegativePrice));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[rstest]
    fn validation_errors_map_to_invalid_request() {
        let err: Error = CourseValidationError::BlankDescription.into();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.details().and_then(|d| d.get("field")), Some(&json!("description")));
    }

    #[rstest]
    fn blank_changes_are_absent() {
        let changes = CourseChanges::try_new(Some("  "), Some(""), None, Some(&[]))
            .expect("blank fields ignored");
        assert_eq!(changes, CourseChanges::default());
    }

    #[rstest]
    fn changes_overwrite_only_present_fields(draft: CourseDraft) {
        let now = Utc::now();
        let mut course = Course::new_pending(
            draft,
            UserId::new("owner").expect("id"),
            vec![CategoryId::random()],
            now,
        );
        let original_categories = course.category_ids.clone();
        let changes = CourseChanges::try_new(Some(" Rust 102 "), None, Some(Decimal::ZERO), None)
            .expect("valid");
        course.apply_changes(changes, None, now);
        assert_eq!(course.title, "Rust 102");
        assert_eq!(course.description, "Ownership and borrowing");
        assert_eq!(course.price.amount(), Decimal::ZERO);
        assert_eq!(course.category_ids, original_categories);
    }

    #[rstest]
    #[case(CourseStatus::Pending, CourseStatus::Published, true)]
    #[case(CourseStatus::Published, CourseStatus::Deleted, true)]
    #[case(CourseStatus::Pending, CourseStatus::Deleted, false)]
    #[case(CourseStatus::Published, CourseStatus::Published, false)]
    #[case(CourseStatus::Deleted, CourseStatus::Published, false)]
    #[case(CourseStatus::Deleted, CourseStatus::Pending, false)]
    fn lifecycle_is_monotonic(
        #[case] from: CourseStatus,
        #[case] to: CourseStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_become(to), allowed);
    }

    #[rstest]
    fn illegal_transition_reports_not_found(draft: CourseDraft) {
        let now = Utc::now();
        let mut course =
            Course::new_pending(draft, UserId::new("owner").expect("id"), Vec::new(), now);
        let err = course.transition(CourseStatus::Deleted, now).expect_err("pending");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(course.status, CourseStatus::Pending);
    }
}
