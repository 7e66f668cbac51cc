//! Category tree entities and the iterative parent-chain walk.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{CategoryId, Error};

/// Longest accepted category name, in characters.
pub const CATEGORY_NAME_MAX_CHARS: usize = 100;

/// Category status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryStatus {
    /// Created but not yet offered to authors.
    Inactive,
    /// Usable for new courses and listings.
    Active,
    /// Soft-deleted.
    Deleted,
}

impl CategoryStatus {
    /// Storage spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status value outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category status `{0}`")]
pub struct UnknownCategoryStatus(pub String);

impl FromStr for CategoryStatus {
    type Err = UnknownCategoryStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INACTIVE" => Ok(Self::Inactive),
            "ACTIVE" => Ok(Self::Active),
            "DELETED" => Ok(Self::Deleted),
            other => Err(UnknownCategoryStatus(other.to_owned())),
        }
    }
}

/// Validate a category name, returning the trimmed form.
pub fn validate_category_name(raw: &str) -> Result<String, Error> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(Error::invalid_request("category name must not be blank")
            .with_details(json!({ "field": "name" })));
    }
    if name.chars().count() > CATEGORY_NAME_MAX_CHARS {
        return Err(Error::invalid_request(format!(
            "category name must be at most {CATEGORY_NAME_MAX_CHARS} characters"
        ))
        .with_details(json!({ "field": "name" })));
    }
    Ok(name.to_owned())
}

/// Persisted category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub status: CategoryStatus,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// New categories start INACTIVE.
    #[must_use]
    pub fn new_inactive(name: String, parent_id: Option<CategoryId>, now: DateTime<Utc>) -> Self {
        Self {
            id: CategoryId::random(),
            name,
            status: CategoryStatus::Inactive,
            parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status change. Returns `false` when already in `target`.
    ///
    /// Deleted categories cannot be revived; any change other than a repeated
    /// delete reports `NotFound`.
    pub fn change_status(&mut self, target: CategoryStatus, now: DateTime<Utc>) -> Result<bool, Error> {
        if self.status == target {
            return Ok(false);
        }
        if self.status == CategoryStatus::Deleted {
            return Err(Error::not_found(format!(
                "Category with id {} not found",
                self.id
            )));
        }
        self.status = target;
        self.updated_at = now;
        Ok(true)
    }
}

/// Nested response shape: the category and its ancestors, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTree {
    pub id: CategoryId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_category: Option<Box<CategoryTree>>,
}

impl CategoryTree {
    /// Fold a leaf-to-root chain into the nested shape, starting at the root.
    ///
    /// Returns `None` for an empty chain.
    #[must_use]
    pub fn from_chain(chain: &[Category]) -> Option<Self> {
        chain.iter().rev().fold(None, |parent, category| {
            Some(Self {
                id: category.id,
                name: category.name.clone(),
                parent_category: parent.map(Box::new),
            })
        })
    }
}

/// Why a parent walk stopped before reaching a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainTruncation {
    /// The chain revisited `repeated`.
    Cycle { repeated: CategoryId },
    /// A parent id named a category that does not exist.
    MissingParent { parent: CategoryId },
}

/// Next action for whoever drives a [`ChainWalk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Load this parent and feed it back with [`ChainWalk::push`].
    Load(CategoryId),
    /// The walk is finished.
    Done,
}

/// Leaf-to-root walk with a visited set.
///
/// Every step either adds an unseen category or stops, so the walk ends after
/// at most one load per stored category however deep the chain is. The
/// walker never loads anything itself, so the same logic serves async
/// repositories and in-memory maps.
#[derive(Debug, Clone)]
pub struct ChainWalk {
    chain: Vec<Category>,
    visited: HashSet<CategoryId>,
    truncation: Option<ChainTruncation>,
}

impl ChainWalk {
    /// Start from `leaf`.
    #[must_use]
    pub fn start(leaf: Category) -> Self {
        let mut visited = HashSet::new();
        visited.insert(leaf.id);
        Self {
            chain: vec![leaf],
            visited,
            truncation: None,
        }
    }

    /// What the driver should do next.
    #[must_use]
    pub fn next_step(&mut self) -> WalkStep {
        if self.truncation.is_some() {
            return WalkStep::Done;
        }
        let Some(parent) = self.chain.last().and_then(|c| c.parent_id) else {
            return WalkStep::Done;
        };
        if self.visited.contains(&parent) {
            self.truncation = Some(ChainTruncation::Cycle { repeated: parent });
            return WalkStep::Done;
        }
        WalkStep::Load(parent)
    }

    /// Feed the category requested by the last [`WalkStep::Load`]; `None`
    /// when it could not be found.
    pub fn push(&mut self, requested: CategoryId, loaded: Option<Category>) {
        match loaded {
            Some(category) => {
                self.visited.insert(category.id);
                self.chain.push(category);
            }
            None => {
                self.truncation = Some(ChainTruncation::MissingParent { parent: requested });
            }
        }
    }

    /// Why the walk stopped early, if it did.
    #[must_use]
    pub const fn truncation(&self) -> Option<ChainTruncation> {
        self.truncation
    }

    /// Finish, yielding the chain leaf-first.
    #[must_use]
    pub fn into_chain(self) -> Vec<Category> {
        self.chain
    }
}
