use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde_json::Value;

use super::jwks::{TokenVerifier, VerifyError};

/// Who the identity provider says is calling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalIdentity {
    pub kinde_id: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub preferred_username: Option<String>,
}

impl ExternalIdentity {
    /// Build from token claims. `sub` is mandatory; the profile claims are
    /// only present on id tokens or when the tenant adds them to access tokens.
    pub fn from_claims(claims: &Value) -> Option<Self> {
        let text = |key: &str| {
            claims
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            kinde_id: text("sub")?,
            email: text("email"),
            given_name: text("given_name"),
            family_name: text("family_name"),
            preferred_username: text("preferred_username"),
        })
    }
}

/// Answers "is there a valid session, and for whom".
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` means unauthenticated. Errors are reserved for the
    /// provider being unreachable.
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<ExternalIdentity>, VerifyError>;
}

/// Resolves the caller from a Kinde access token sent either as a bearer
/// token or in the session cookie.
pub struct KindeIdentityResolver {
    verifier: Arc<dyn TokenVerifier>,
    cookie_name: String,
}

impl KindeIdentityResolver {
    pub fn new(verifier: Arc<dyn TokenVerifier>, cookie_name: impl Into<String>) -> Self {
        Self {
            verifier,
            cookie_name: cookie_name.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for KindeIdentityResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<ExternalIdentity>, VerifyError> {
        let Some(token) = extract_token(headers, &self.cookie_name) else {
            return Ok(None);
        };

        match self.verifier.verify(token).await {
            Ok(claims) => Ok(ExternalIdentity::from_claims(&claims)),
            Err(e) if e.is_rejection() => {
                tracing::debug!("Rejected session token: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Bearer token first, then the session cookie.
pub fn extract_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
