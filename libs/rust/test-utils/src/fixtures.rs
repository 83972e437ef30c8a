//! Test fixtures with sample data.
//!
//! Example values mirror what the providers' own tests use, so contract
//! files stay readable on both sides.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

/// Consumer name written to every contract.
pub const CONSUMER: &str = "bit-jme-cdct-segregated-consumer-service";
/// Task provider name.
pub const TASK_PROVIDER: &str = "bit-jme-cdct-segregated-provider-service_task";
/// User provider name.
pub const USER_PROVIDER: &str = "bit-jme-cdct-segregated-provider-service_user";

/// Task resource path on the provider.
pub const TASK_API_PATH: &str = "/jme-cdct-segregated-provider-service/api/task";
/// User resource path on the provider.
pub const USER_API_PATH: &str = "/jme-cdct-segregated-provider-service/api/user";

/// Example task id.
pub const TASK_ID_EXAMPLE: &str = "123456789";
/// Example task title.
pub const TASK_TITLE_EXAMPLE: &str = "test-title";
/// Example task content.
pub const TASK_CONTENT_EXAMPLE: &str = "test-content";
/// Example user id.
pub const USER_ID_EXAMPLE: &str = "3423489";
/// Example user name.
pub const USER_NAME_EXAMPLE: &str = "test-name";

/// Role without access to any provider resource.
pub const UNRELATED_ROLE: &str = "some-unrelated-role";

/// Expiry far enough in the future that fixture tokens never go stale (2100-01-01).
pub const FIXED_EXPIRY: u64 = 4_102_444_800;
const FIXED_ISSUED_AT: u64 = 1_700_000_000;
const FIXTURE_ISSUER: &str = "https://auth.test.local";
const FIXTURE_SIGNING_KEY: &[u8] = b"consumer-gateway-contract-test-key";

/// Claims carried by fixture access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixtureClaims {
    /// Client the token was issued to
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Authentication context
    pub ctx: String,
    /// Granted roles
    pub userroles: Vec<String>,
    /// Issued at
    pub iat: u64,
    /// Expiry
    pub exp: u64,
}

/// Semantic role `{system}_@{resource}_#{operation}`.
#[must_use]
pub fn semantic_role(system: &str, resource: &str, operation: &str) -> String {
    format!("{system}_@{resource}_#{operation}")
}

/// Deterministic HS256 access token for `subject` with `roles`.
///
/// Same input, same token: interactions that embed the token in a header
/// produce stable contract files.
///
/// # Errors
///
/// Returns the signing error from `jsonwebtoken`.
pub fn access_token(
    subject: &str,
    roles: &[String],
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = FixtureClaims {
        sub: subject.to_string(),
        iss: FIXTURE_ISSUER.to_string(),
        ctx: "SYS".to_string(),
        userroles: roles.to_vec(),
        iat: FIXED_ISSUED_AT,
        exp: FIXED_EXPIRY,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(FIXTURE_SIGNING_KEY),
    )
}

/// Tokens prepared for one client's contract tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTokens {
    /// Token granting `jme/{resource}/read`
    pub read: String,
    /// Token carrying only [`UNRELATED_ROLE`]
    pub unrelated_role: String,
}

impl ClientTokens {
    /// Tokens for the task client.
    ///
    /// # Errors
    ///
    /// Returns the signing error from `jsonwebtoken`.
    pub fn task_client() -> Result<Self, jsonwebtoken::errors::Error> {
        Self::for_resource("taskClient", "task")
    }

    /// Tokens for the user client.
    ///
    /// # Errors
    ///
    /// Returns the signing error from `jsonwebtoken`.
    pub fn user_client() -> Result<Self, jsonwebtoken::errors::Error> {
        Self::for_resource("userClient", "user")
    }

    fn for_resource(subject: &str, resource: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            read: access_token(subject, &[semantic_role("jme", resource, "read")])?,
            unrelated_role: access_token(subject, &[UNRELATED_ROLE.to_string()])?,
        })
    }
}

/// `Bearer <token>` header value.
#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
