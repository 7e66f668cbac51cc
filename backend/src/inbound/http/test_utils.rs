//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::web;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;

use crate::domain::ports::{
    MockCategoryCommand, MockCategoryQuery, MockCourseCommand, MockCourseQuery,
};

use super::auth::{EXPECTED_ISSUER, TokenVerifier};
use super::state::{HttpState, HttpStatePorts};

/// Base64 HMAC secret shared by minted test tokens and the verifier.
pub const TEST_SECRET: &str = "Y291cnNlLWh1Yi10ZXN0LXNpZ25pbmcta2V5LTAxMjM0NTY3ODlhYmNkZWY=";

/// Sign a token for `user_id` with `role` using [`TEST_SECRET`].
pub fn mint_token(user_id: &str, role: &str) -> String {
    let claims = json!({
        "iss": EXPECTED_ISSUER,
        "sub": format!("{user_id}-name"),
        "user_id": user_id,
        "email": format!("{user_id}@example.com"),
        "role": role,
    });
    let key = EncodingKey::from_base64_secret(TEST_SECRET).expect("valid secret");
    encode(&Header::new(Algorithm::HS256), &claims, &key).expect("token encodes")
}

/// `Authorization` header tuple for `user_id` with `role`.
pub fn bearer(user_id: &str, role: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", mint_token(user_id, role)))
}

/// Mocks for every driving port; tests set expectations on the ones they use.
#[derive(Default)]
pub struct MockPorts {
    pub courses: MockCourseCommand,
    pub courses_query: MockCourseQuery,
    pub categories: MockCategoryCommand,
    pub categories_query: MockCategoryQuery,
}

impl MockPorts {
    /// Freeze the mocks into shared HTTP state.
    pub fn into_state(self) -> web::Data<HttpState> {
        let tokens = TokenVerifier::from_base64_secret(TEST_SECRET).expect("valid secret");
        web::Data::new(HttpState::new(
            HttpStatePorts {
                courses: Arc::new(self.courses),
                courses_query: Arc::new(self.courses_query),
                categories: Arc::new(self.categories),
                categories_query: Arc::new(self.categories_query),
            },
            Arc::new(tokens),
        ))
    }
}
