//! Caller identity derived from a verified bearer token.
//!
//! A [`RequestContext`] travels with every operation. It holds the verified
//! [`Principal`] (if any) and the raw credential that must be forwarded to the
//! identity service when the caller's own profile is needed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::Error;

/// Stable identifier of a user issued by the identity service.
///
/// ## Invariants
/// - Never blank; surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

/// Rejected user identifier input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("user id must not be blank")]
pub struct BlankUserId;

impl UserId {
    /// Validate and wrap a raw identifier.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, BlankUserId> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(BlankUserId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = BlankUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role granted by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular learner.
    User,
    /// May author and manage their own courses.
    Instructor,
    /// Bypasses ownership checks.
    Admin,
}

/// Role claim outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts both `ADMIN` and the `ROLE_ADMIN` authority spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix("ROLE_").unwrap_or(trimmed);
        match bare.to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "INSTRUCTOR" => Ok(Self::Instructor),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}

impl Role {
    /// Authority string as issued in tokens.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Instructor => "INSTRUCTOR",
            Self::Admin => "ADMIN",
        }
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: UserId,
    username: String,
    email: String,
    role: Role,
    enabled: bool,
    locked: bool,
}

impl Principal {
    /// Build an enabled, unlocked principal.
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            role,
            enabled: true,
            locked: false,
        }
    }

    /// Mark the account disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Mark the account locked.
    #[must_use]
    pub const fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Identity-service user id.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Token subject.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Email claim, possibly empty.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Granted role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the caller bypasses ownership checks.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Whether the caller holds any of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Reject disabled or locked accounts.
    pub fn ensure_active(&self) -> Result<(), Error> {
        if !self.enabled {
            return Err(Error::account_disabled("account is disabled"));
        }
        if self.locked {
            return Err(Error::account_disabled("account is locked"));
        }
        Ok(())
    }
}

/// `Authorization` header value to replay against the identity service.
///
/// The value is zeroised on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ForwardedCredential(Zeroizing<String>);

impl ForwardedCredential {
    /// Forward an inbound `Authorization` header as-is.
    #[must_use]
    pub fn from_authorization_header(value: &str) -> Self {
        Self(Zeroizing::new(value.trim().to_owned()))
    }

    /// Promote a bare token (for example from the `access_token` cookie) to a
    /// bearer header value.
    #[must_use]
    pub fn from_bearer_token(token: &str) -> Self {
        Self(Zeroizing::new(format!("Bearer {}", token.trim())))
    }

    /// Header value to send upstream.
    #[must_use]
    pub fn header_value(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ForwardedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ForwardedCredential(<redacted>)")
    }
}

/// Identity attached to a single inbound operation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    principal: Option<Principal>,
    credential: Option<ForwardedCredential>,
}

impl RequestContext {
    /// Context for a caller that presented no usable token.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for a verified caller.
    #[must_use]
    pub const fn authenticated(principal: Principal, credential: ForwardedCredential) -> Self {
        Self {
            principal: Some(principal),
            credential: Some(credential),
        }
    }

    /// Verified principal, if any.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Credential to forward upstream, if any.
    #[must_use]
    pub const fn credential(&self) -> Option<&ForwardedCredential> {
        self.credential.as_ref()
    }

    /// Return the active principal or fail with `Unauthenticated` /
    /// `AccountDisabled`.
    pub fn require_principal(&self) -> Result<&Principal, Error> {
        let principal = self
            .principal
            .as_ref()
            .ok_or_else(|| Error::unauthenticated("authentication is required"))?;
        principal.ensure_active()?;
        Ok(principal)
    }

    /// Like [`Self::require_principal`], additionally demanding one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<&Principal, Error> {
        let principal = self.require_principal()?;
        if principal.has_any_role(roles) {
            Ok(principal)
        } else {
            Err(Error::unauthorized(format!(
                "role {} may not perform this operation",
                principal.role().as_str()
            )))
        }
    }
}
