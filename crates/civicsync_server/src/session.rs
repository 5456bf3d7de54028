//! Session tokens: HS256 JWTs carried in an HttpOnly cookie.

use chrono::{DateTime, Duration, Utc};
use civicsync_core::{
    actor::{Identity, Role},
    error::CivicError,
};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_SESSION_COOKIE;

/// How long a session stays valid after login.
pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Signing and verification keys plus the cookie settings that carry the token.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    cookie_name: String,
    secure: bool,
}

impl SessionKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            cookie_name: DEFAULT_SESSION_COOKIE.into(),
            secure: false,
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, CivicError> {
        self.issue_at(identity, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`.
    pub fn issue_at(&self, identity: &Identity, issued_at: DateTime<Utc>) -> Result<String, CivicError> {
        let claims = SessionClaims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CivicError::Store(anyhow::anyhow!("signing session token: {e}")))
    }

    /// `None` for anything that is not a live token signed with our secret.
    pub fn verify(&self, token: &str) -> Option<Identity> {
        let data = match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "rejected session token");
                return None;
            }
        };
        let id = Uuid::parse_str(&data.claims.sub).ok()?;
        Some(Identity {
            id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }

    /// Pull our token out of a raw `Cookie` request header.
    pub fn token_from_header(&self, header: &str) -> Option<String> {
        Cookie::split_parse(header)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(cookie::time::Duration::days(SESSION_TTL_DAYS))
            .secure(self.secure)
            .build()
    }

    pub fn cleared_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(cookie::time::Duration::ZERO)
            .secure(self.secure)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::from_secret(b"unit-test-secret")
    }

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "asha@example.org".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn issue_then_verify() {
        let who = identity();
        let token = keys().issue(&who).unwrap();
        assert_eq!(keys().verify(&token), Some(who));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::days(SESSION_TTL_DAYS) - Duration::seconds(5);
        let token = keys().issue_at(&identity(), issued).unwrap();
        assert_eq!(keys().verify(&token), None);
    }

    #[test]
    fn six_day_old_token_still_verifies() {
        let issued = Utc::now() - Duration::days(6);
        let token = keys().issue_at(&identity(), issued).unwrap();
        assert!(keys().verify(&token).is_some());
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = SessionKeys::from_secret(b"someone-else").issue(&identity()).unwrap();
        assert_eq!(keys().verify(&token), None);
    }

    #[test]
    fn tampered_and_garbage_tokens_are_rejected() {
        // Payload of one token under the signature of another.
        let mine = keys().issue(&identity()).unwrap();
        let forged = keys().issue(&identity()).unwrap();
        let (forged_body, _) = forged.rsplit_once('.').unwrap();
        let (_, my_sig) = mine.rsplit_once('.').unwrap();
        assert_eq!(keys().verify(&format!("{forged_body}.{my_sig}")), None);
        assert_eq!(keys().verify("not.a.jwt"), None);
        assert_eq!(keys().verify(""), None);
    }

    #[test]
    fn cookie_header_lookup() {
        let k = keys().with_cookie_name("token");
        let found = k.token_from_header("theme=dark; token=abc.def.ghi; other=1");
        assert_eq!(found.as_deref(), Some("abc.def.ghi"));
        assert!(k.token_from_header("theme=dark").is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = keys().with_secure_cookies(true).session_cookie("t".into());
        let rendered = cookie.to_string();
        assert!(rendered.starts_with("token=t"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=604800"));
        assert!(rendered.contains("Secure"));

        let cleared = keys().cleared_cookie().to_string();
        assert!(cleared.contains("Max-Age=0"));
        assert!(!cleared.contains("Secure"));
    }
}
