// LogDepot - app/auth.rs
//
// AccessGate: stateless HS256 identity tokens.
//
// `issue` mints a token for a verified username; `authorize` checks the
// signature, expiry, not-before and issuer of a presented token and yields
// the identity it names. No server-side session state is kept, so tokens
// stay valid until they expire.

use crate::util::constants;
use crate::util::error::AuthError;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by every LogDepot access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    /// Unique token id.
    pub jti: String,
}

/// The caller a valid token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct AccessGate {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl AccessGate {
    /// Build a gate from a signing secret of at least
    /// `MIN_JWT_SECRET_BYTES` bytes.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        ttl_minutes: i64,
    ) -> Result<Self, AuthError> {
        if secret.len() < constants::MIN_JWT_SECRET_BYTES {
            return Err(AuthError::WeakSecret {
                length: secret.len(),
                min_length: constants::MIN_JWT_SECRET_BYTES,
            });
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl: Duration::minutes(ttl_minutes),
        })
    }

    /// Build a gate with a random secret that lives only as long as this
    /// process. Tokens it issues do not survive a restart.
    pub fn ephemeral(issuer: impl Into<String>, ttl_minutes: i64) -> Self {
        let secret = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Mint a token for `username`, valid for the configured lifetime.
    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iss: self.issuer.clone(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        self.encode_claims(&claims)
    }

    /// Validate `token` and return the identity it carries.
    pub fn authorize(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken { source: e },
            }
        })?;
        Ok(Identity {
            username: data.claims.sub,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|source| AuthError::Signing { source })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "sub", "iss"]);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn gate() -> AccessGate {
        AccessGate::new(SECRET, "logdepot-test", 15).unwrap()
    }

    #[test]
    fn test_issue_then_authorize() {
        let gate = gate();
        let token = gate.issue("alice").unwrap();
        let identity = gate.authorize(&token).unwrap();
        assert_eq!(identity.username, "alice");
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let err = AccessGate::new(b"too short", "x", 15).unwrap_err();
        assert!(matches!(err, AuthError::WeakSecret { length: 9, .. }));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let gate = gate();
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: "alice".to_string(),
            iss: "logdepot-test".to_string(),
            exp: (past + Duration::minutes(15)).timestamp(),
            iat: past.timestamp(),
            nbf: past.timestamp(),
            jti: "t-1".to_string(),
        };
        let token = gate.encode_claims(&claims).unwrap();
        assert!(matches!(gate.authorize(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let other = AccessGate::new(b"ffffffffffffffffffffffffffffffff", "logdepot-test", 15)
            .unwrap();
        let token = other.issue("mallory").unwrap();
        assert!(matches!(
            gate().authorize(&token),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let other = AccessGate::new(SECRET, "someone-else", 15).unwrap();
        let token = other.issue("alice").unwrap();
        assert!(gate().authorize(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(matches!(
            gate().authorize("not.a.token"),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_ephemeral_gates_do_not_share_secrets() {
        let a = AccessGate::ephemeral("logdepot", 15);
        let b = AccessGate::ephemeral("logdepot", 15);
        let token = a.issue("alice").unwrap();
        assert!(a.authorize(&token).is_ok());
        assert!(b.authorize(&token).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", gate());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
