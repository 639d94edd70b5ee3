//! Platform authentication helpers.
//!
//! Issues and verifies the stateless bearer tokens handed out on login. A token
//! carries only the employee id as `sub`; nothing is stored server side, so a
//! token stays valid until `exp` passes.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HS256 keys shorter than the digest size are rejected.
pub const MIN_SECRET_LEN: usize = 32;
pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthnError {
    #[error("signing secret must be at least 32 bytes, got {0}")]
    WeakSecret(usize),
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Claims carried by an identity assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Employee id, rendered as a string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl IdentityClaims {
    pub fn employee_id(&self) -> Result<i32, AuthnError> {
        self.sub.parse().map_err(|_| AuthnError::Malformed)
    }
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Result<Self, AuthnError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthnError::WeakSecret(secret.len()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::days(TOKEN_TTL_DAYS),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, employee_id: i32) -> Result<String, AuthnError> {
        self.issue_at(employee_id, Utc::now())
    }

    /// Sign a token as if it had been issued at `now`.
    pub fn issue_at(&self, employee_id: i32, now: DateTime<Utc>) -> Result<String, AuthnError> {
        let claims = IdentityClaims {
            sub: employee_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthnError::Signing(err.to_string()))
    }

    /// Check signature, algorithm and expiry (with the library's default leeway).
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, AuthnError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthnError::Expired,
                ErrorKind::InvalidSignature => AuthnError::InvalidSignature,
                _ => AuthnError::Malformed,
            })
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_key_for_testing_purposes_only";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET).unwrap()
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue_at(42, now).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.employee_id().unwrap(), 42);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, claims.iat + 7 * 24 * 60 * 60);
    }

    #[test]
    fn token_is_accepted_six_days_after_issue() {
        let issuer = issuer();
        let issued = Utc::now() - Duration::days(6);
        let token = issuer.issue_at(7, issued).unwrap();
        assert!(issuer.verify(&token).is_ok());
    }

    #[test]
    fn token_is_rejected_eight_days_after_issue() {
        let issuer = issuer();
        let issued = Utc::now() - Duration::days(8);
        let token = issuer.issue_at(7, issued).unwrap();
        assert_eq!(issuer.verify(&token), Err(AuthnError::Expired));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenIssuer::new(b"another_secret_key_that_is_long_enough").unwrap();
        let token = other.issue(1).unwrap();
        assert_eq!(issuer().verify(&token), Err(AuthnError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(issuer().verify("not-a-token"), Err(AuthnError::Malformed));
    }

    #[test]
    fn short_secrets_are_refused() {
        assert_eq!(
            TokenIssuer::new(b"short").unwrap_err(),
            AuthnError::WeakSecret(5)
        );
    }

    #[test]
    fn non_numeric_subject_is_malformed() {
        let claims = IdentityClaims {
            sub: "alice".into(),
            iat: 0,
            exp: 0,
        };
        assert_eq!(claims.employee_id(), Err(AuthnError::Malformed));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer   abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
