//! Session tokens: HS256 JWTs carried in an HTTP-only `token` cookie.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::AppConfig;

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session secret not configured")]
    MissingSecret,

    #[error("Missing session token")]
    MissingToken,

    #[error("Session token expired")]
    Expired,

    #[error("Invalid session token: {0}")]
    Invalid(String),

    #[error("Failed to sign session token: {0}")]
    Signing(String),
}

/// Claims carried by a session token. The identity payload is whatever the
/// client authenticated as (typically `{ "email": ... }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub identity: Map<String, Value>,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn new(mut identity: Map<String, Value>, issued_at: DateTime<Utc>, ttl_hours: u64) -> Self {
        identity.remove("exp");
        identity.remove("iat");
        Self {
            identity,
            exp: (issued_at + Duration::hours(ttl_hours as i64)).timestamp(),
            iat: issued_at.timestamp(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.identity.get("email").and_then(Value::as_str)
    }
}

/// Cookie attributes, gated by deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn for_config(config: &AppConfig) -> Self {
        Self {
            secure: config.is_production(),
        }
    }

    fn attributes(&self) -> &'static str {
        if self.secure {
            "HttpOnly; Secure; SameSite=None"
        } else {
            "HttpOnly; SameSite=Strict"
        }
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn session_cookie(&self, token: &str, ttl_hours: u64) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; {}",
            SESSION_COOKIE,
            token,
            ttl_hours * 3600,
            self.attributes()
        )
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clearing_cookie(&self) -> String {
        format!("{}=; Path=/; Max-Age=0; {}", SESSION_COOKIE, self.attributes())
    }
}

/// Signing and verification keys plus the session lifetime.
pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_hours: u64,
    policy: CookiePolicy,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("keys", &"[hidden]")
            .field("ttl_hours", &self.ttl_hours)
            .field("policy", &self.policy)
            .finish()
    }
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: u64, policy: CookiePolicy) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::MissingSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
            policy,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, SessionError> {
        Self::new(
            &config.security.token_secret,
            config.security.session_ttl_hours,
            CookiePolicy::for_config(config),
        )
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl_hours
    }

    /// Sign an identity payload, valid from now.
    pub fn issue(&self, identity: Map<String, Value>) -> Result<String, SessionError> {
        self.issue_at(identity, Utc::now())
    }

    /// Sign an identity payload as if issued at `issued_at`.
    pub fn issue_at(
        &self,
        identity: Map<String, Value>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let claims = SessionClaims::new(identity, issued_at, self.ttl_hours);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }

        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.validate_aud = false;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(e.to_string()),
            })
    }

    pub fn session_cookie(&self, token: &str) -> String {
        self.policy.session_cookie(token, self.ttl_hours)
    }

    pub fn clearing_cookie(&self) -> String {
        self.policy.clearing_cookie()
    }
}

/// Pull the session token out of the request: the `token` cookie first,
/// then an `Authorization: Bearer` header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", 24, CookiePolicy { secure: false }).unwrap()
    }

    fn identity(email: &str) -> Map<String, Value> {
        json!({ "email": email }).as_object().cloned().unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys();
        let token = keys.issue(identity("a@x.com")).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.email(), Some("a@x.com"));
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn token_issued_23_hours_ago_still_verifies() {
        let keys = keys();
        let token = keys
            .issue_at(identity("a@x.com"), Utc::now() - Duration::hours(23))
            .unwrap();
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys();
        let token = keys
            .issue_at(identity("a@x.com"), Utc::now() - Duration::hours(25))
            .unwrap();
        assert!(matches!(keys.verify(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = SessionKeys::new("other-secret", 24, CookiePolicy { secure: false }).unwrap();
        let token = other.issue(identity("a@x.com")).unwrap();
        assert!(matches!(keys().verify(&token), Err(SessionError::Invalid(_))));
    }

    #[test]
    fn swapped_payload_is_rejected() {
        let keys = keys();
        let alice = keys.issue(identity("alice@x.com")).unwrap();
        let mallory = keys.issue(identity("mallory@x.com")).unwrap();

        let alice_parts: Vec<&str> = alice.split('.').collect();
        let mallory_parts: Vec<&str> = mallory.split('.').collect();
        let forged = format!("{}.{}.{}", alice_parts[0], mallory_parts[1], alice_parts[2]);

        assert!(matches!(keys.verify(&forged), Err(SessionError::Invalid(_))));
    }

    #[test]
    fn client_supplied_expiry_is_replaced() {
        let keys = keys();
        let mut payload = identity("a@x.com");
        payload.insert("exp".to_string(), json!(i64::MAX));
        let token = keys.issue(payload).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert!(claims.exp < Utc::now().timestamp() + 24 * 3600 + 5);
    }

    #[test]
    fn empty_secret_is_refused() {
        let result = SessionKeys::new("", 24, CookiePolicy { secure: false });
        assert!(matches!(result, Err(SessionError::MissingSecret)));
    }

    #[test]
    fn empty_token_is_missing() {
        assert!(matches!(keys().verify(""), Err(SessionError::MissingToken)));
    }

    #[test]
    fn cookie_attributes_follow_policy() {
        let dev = CookiePolicy { secure: false }.session_cookie("abc", 24);
        assert_eq!(dev, "token=abc; Path=/; Max-Age=86400; HttpOnly; SameSite=Strict");

        let prod = CookiePolicy { secure: true }.clearing_cookie();
        assert_eq!(prod, "token=; Path=/; Max-Age=0; HttpOnly; Secure; SameSite=None");
    }

    #[test]
    fn extracts_token_from_cookie_or_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc.def.ghi"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(extract_token(&headers), None);
    }
}
