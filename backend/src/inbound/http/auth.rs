//! Stateless bearer-token authentication.
//!
//! Tokens are HMAC-signed JWTs minted by the identity service. Verification
//! never fails a request: a missing, forged, expired or malformed token simply
//! yields an anonymous [`RequestContext`], and handlers that need a principal
//! reject it with `Unauthenticated`.

use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{Ready, ready};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::domain::{Error, ForwardedCredential, Principal, RequestContext, Role, UserId};

use super::state::HttpState;

/// Issuer every accepted token must carry.
pub const EXPECTED_ISSUER: &str = "course-hub-identity-service";
/// Cookie consulted when no bearer header is present.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    user_id: Option<String>,
    email: Option<String>,
    role: Option<String>,
}

/// Verifies access tokens against the shared HMAC secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Build a verifier from a base64-encoded secret.
    ///
    /// # Errors
    ///
    /// Returns an error when `secret` is not valid base64.
    pub fn from_base64_secret(secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_base64_secret(secret)?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["iss", "sub"]);
        validation.set_issuer(&[EXPECTED_ISSUER]);
        Ok(Self { key, validation })
    }

    /// Decode `token` into a principal, or `None` when it cannot be trusted.
    #[must_use]
    pub fn verify_token(&self, token: &str) -> Option<Principal> {
        let claims = match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => data.claims,
            Err(err) => {
                warn!(error = %err, "access token verification failed");
                return None;
            }
        };
        let (Some(username), Some(user_id), Some(email), Some(role)) =
            (claims.sub, claims.user_id, claims.email, claims.role)
        else {
            error!("access token is missing required claims");
            return None;
        };
        let id = match UserId::new(&user_id) {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "access token carries an invalid user id");
                return None;
            }
        };
        let role = match role.parse::<Role>() {
            Ok(role) => role,
            Err(err) => {
                error!(error = %err, "access token carries an unknown role");
                return None;
            }
        };
        Some(Principal::new(id, username, email, role))
    }

    /// Derive the request context from the bearer header or the
    /// `access_token` cookie, in that order.
    #[must_use]
    pub fn authenticate(&self, req: &HttpRequest) -> RequestContext {
        let Some((token, credential)) = locate_token(req) else {
            return RequestContext::anonymous();
        };
        match self.verify_token(&token) {
            Some(principal) => {
                debug!(user_id = %principal.id(), role = principal.role().as_str(), "caller authenticated");
                RequestContext::authenticated(principal, credential)
            }
            None => RequestContext::anonymous(),
        }
    }
}

fn locate_token(req: &HttpRequest) -> Option<(String, ForwardedCredential)> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Some(value) = header {
        if let Some(token) = value.strip_prefix(BEARER_PREFIX) {
            return Some((
                token.to_owned(),
                ForwardedCredential::from_authorization_header(value),
            ));
        }
    }
    let cookie = req.cookie(ACCESS_TOKEN_COOKIE)?;
    let token = cookie.value();
    if token.is_empty() {
        return None;
    }
    Some((token.to_owned(), ForwardedCredential::from_bearer_token(token)))
}

/// Extractor yielding the caller's [`RequestContext`].
///
/// Requires [`HttpState`] to be registered as app data.
#[derive(Debug, Clone)]
pub struct Caller(RequestContext);

impl Caller {
    /// Borrow the request context.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = req
            .app_data::<web::Data<HttpState>>()
            .map(|state| Arc::clone(&state.tokens))
            .map(|tokens| Self(tokens.authenticate(req)))
            .ok_or_else(|| Error::internal("HTTP state is not configured").into());
        ready(result)
    }
}
