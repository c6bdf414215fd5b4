use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("no signing key with kid {0}")]
    UnknownKey(String),

    #[error("failed to fetch signing keys: {0}")]
    Fetch(String),
}

impl VerifyError {
    /// True when the token itself is at fault, as opposed to the key source.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, VerifyError::Fetch(_))
    }
}

/// Verifies a compact JWT and hands back its claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Value, VerifyError>;
}

/// The identity provider's published signing keys, fetched lazily and
/// refreshed when a token names a key id we have not seen. Refreshes are
/// spaced at least `refresh_cooldown` apart, so a stream of tokens with
/// made-up key ids costs one fetch per window.
pub struct JwksClient {
    http: reqwest::Client,
    url: String,
    refresh_cooldown: Duration,
    cache: RwLock<KeyCache>,
}

struct KeyCache {
    keys: JwkSet,
    last_refresh: Option<Instant>,
}

impl KeyCache {
    fn refresh_due(&self, cooldown: Duration) -> bool {
        self.last_refresh.map_or(true, |at| at.elapsed() >= cooldown)
    }
}

impl JwksClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    const REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

    pub fn new(url: impl Into<String>) -> Result<Self, VerifyError> {
        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VerifyError::Fetch(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            refresh_cooldown: Self::REFRESH_COOLDOWN,
            cache: RwLock::new(KeyCache {
                keys: JwkSet { keys: Vec::new() },
                last_refresh: None,
            }),
        })
    }

    /// Kinde publishes its keys at a fixed path under the tenant domain.
    pub fn for_kinde_domain(domain: &str) -> Result<Self, VerifyError> {
        Self::new(format!("{}/.well-known/jwks.json", kinde_issuer(domain)))
    }

    /// Client with a fixed key set; a refresh still goes to `url`.
    pub fn with_keys(url: impl Into<String>, keys: JwkSet) -> Result<Self, VerifyError> {
        let client = Self::new(url)?;
        Ok(Self {
            cache: RwLock::new(KeyCache {
                keys,
                last_refresh: None,
            }),
            ..client
        })
    }

    pub fn with_refresh_cooldown(self, cooldown: Duration) -> Self {
        Self {
            refresh_cooldown: cooldown,
            ..self
        }
    }

    async fn fetch(&self) -> Result<JwkSet, VerifyError> {
        tracing::debug!("Fetching JWKS from {}", self.url);
        self.http
            .get(&self.url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| VerifyError::Fetch(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| VerifyError::Fetch(e.to_string()))
    }

    pub async fn key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(jwk) = self.cache.read().await.keys.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        // Concurrent misses queue on the write lock and share one fetch
        let mut cache = self.cache.write().await;
        if cache.keys.find(kid).is_none() {
            if !cache.refresh_due(self.refresh_cooldown) {
                return Err(VerifyError::UnknownKey(kid.to_string()));
            }
            // Failed attempts count against the cooldown too
            cache.last_refresh = Some(Instant::now());
            cache.keys = self.fetch().await?;
        }

        let jwk = cache
            .keys
            .find(kid)
            .ok_or_else(|| VerifyError::UnknownKey(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }
}

pub fn kinde_issuer(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// RS256 verifier backed by a JWKS document.
pub struct JwtVerifier {
    jwks: std::sync::Arc<JwksClient>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(jwks: std::sync::Arc<JwksClient>, validation: Validation) -> Self {
        Self { jwks, validation }
    }

    /// Access tokens: signed by the tenant, unexpired, and for our audience
    /// when one is configured.
    pub fn access_tokens(
        jwks: std::sync::Arc<JwksClient>,
        issuer: &str,
        audience: Option<&str>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self::new(jwks, validation)
    }

    /// Webhook payloads carry no expiry or audience; only the signature counts.
    pub fn webhooks(jwks: std::sync::Arc<JwksClient>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        Self::new(jwks, validation)
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Value, VerifyError> {
        let header = jsonwebtoken::decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Malformed("token header has no kid".into()))?;
        let key = self.jwks.key(&kid).await?;
        let data = jsonwebtoken::decode::<Value>(token, &key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SIGNING_KEY: &str = include_str!("../../tests/fixtures/test_signing_key.pem");
    const JWKS: &str = include_str!("../../tests/fixtures/test_jwks.json");
    const ISSUER: &str = "https://novelbug.kinde.com";

    fn jwks() -> Arc<JwksClient> {
        let keys: JwkSet = serde_json::from_str(JWKS).unwrap();
        // Unroutable URL: any refresh attempt must fail rather than hang
        Arc::new(JwksClient::with_keys("http://127.0.0.1:9/jwks.json", keys).unwrap())
    }

    fn sign(claims: &Value, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        let key = EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).unwrap();
        jsonwebtoken::encode(&header, claims, &key).unwrap()
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn issuer_accepts_bare_and_schemed_domains() {
        assert_eq!(kinde_issuer("novelbug.kinde.com"), ISSUER);
        assert_eq!(kinde_issuer("https://novelbug.kinde.com/"), ISSUER);
    }

    #[tokio::test]
    async fn valid_access_token_yields_claims() {
        let verifier = JwtVerifier::access_tokens(jwks(), ISSUER, None);
        let token = sign(
            &json!({"sub": "kp_123", "iss": ISSUER, "exp": in_an_hour()}),
            Some("test-key"),
        );

        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims["sub"], "kp_123");
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let verifier = JwtVerifier::access_tokens(jwks(), ISSUER, None);
        let token = sign(
            &json!({"sub": "kp_123", "iss": "https://evil.example", "exp": in_an_hour()}),
            Some("test-key"),
        );

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let verifier = JwtVerifier::access_tokens(jwks(), ISSUER, None);
        let token = sign(
            &json!({"sub": "kp_123", "iss": ISSUER, "exp": 1_000_000}),
            Some("test-key"),
        );
        assert!(verifier.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn audience_is_checked_when_configured() {
        let verifier = JwtVerifier::access_tokens(jwks(), ISSUER, Some("novelbug-api"));
        let token = sign(
            &json!({"sub": "kp_123", "iss": ISSUER, "exp": in_an_hour(), "aud": ["other"]}),
            Some("test-key"),
        );
        assert!(verifier.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn webhook_tokens_need_no_expiry() {
        let verifier = JwtVerifier::webhooks(jwks());
        let token = sign(
            &json!({"type": "user.created", "data": {"user": {"id": "kp_1"}}}),
            Some("test-key"),
        );

        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims["type"], "user.created");
    }

    #[tokio::test]
    async fn token_without_kid_is_malformed() {
        let verifier = JwtVerifier::webhooks(jwks());
        let token = sign(&json!({"type": "user.created"}), None);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    /// Serves the fixture key set and counts requests.
    async fn serve_jwks(hits: Arc<AtomicUsize>) -> String {
        let app = axum::Router::new().route(
            "/jwks.json",
            axum::routing::get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    ([(axum::http::header::CONTENT_TYPE, "application/json")], JWKS)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/jwks.json")
    }

    fn access_token(kid: &str) -> String {
        sign(
            &json!({"sub": "kp_123", "iss": ISSUER, "exp": in_an_hour()}),
            Some(kid),
        )
    }

    #[tokio::test]
    async fn unknown_kids_refresh_once_per_cooldown() {
        let hits = Arc::new(AtomicUsize::new(0));
        let jwks = Arc::new(JwksClient::new(serve_jwks(hits.clone()).await).unwrap());
        let verifier = JwtVerifier::access_tokens(jwks, ISSUER, None);

        for i in 0..20 {
            let err = verifier
                .verify(&access_token(&format!("bogus-{i}")))
                .await
                .unwrap_err();
            assert!(matches!(err, VerifyError::UnknownKey(_)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // The one fetch picked up the real key
        verifier.verify(&access_token("test-key")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let jwks = Arc::new(JwksClient::new(serve_jwks(hits.clone()).await).unwrap());
        let verifier = Arc::new(JwtVerifier::access_tokens(jwks, ISSUER, None));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let verifier = verifier.clone();
                tokio::spawn(async move { verifier.verify(&access_token("test-key")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_allowed_again_after_cooldown() {
        let hits = Arc::new(AtomicUsize::new(0));
        let jwks = JwksClient::new(serve_jwks(hits.clone()).await)
            .unwrap()
            .with_refresh_cooldown(Duration::ZERO);
        let verifier = JwtVerifier::access_tokens(Arc::new(jwks), ISSUER, None);

        assert!(verifier.verify(&access_token("bogus-1")).await.is_err());
        assert!(verifier.verify(&access_token("bogus-2")).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let verifier = JwtVerifier::webhooks(jwks());
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(err.is_rejection());
    }
}
