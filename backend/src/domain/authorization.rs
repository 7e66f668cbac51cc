//! Ownership policy for course mutations.

use super::{Error, Principal, UserId};

/// Succeed when `principal` owns the resource or is an administrator.
pub fn ensure_owner_or_admin(owner: &UserId, principal: &Principal) -> Result<(), Error> {
    if principal.is_admin() || principal.id() == owner {
        return Ok(());
    }
    tracing::debug!(
        owner = %owner,
        caller = %principal.id(),
        "ownership check refused"
    );
    Err(Error::unauthorized("you are not the owner of this course"))
}

/// Boolean form of [`ensure_owner_or_admin`] for owner-check queries.
#[must_use]
pub fn is_owner_or_admin(owner: &UserId, principal: &Principal) -> bool {
    principal.is_admin() || principal.id() == owner
}
