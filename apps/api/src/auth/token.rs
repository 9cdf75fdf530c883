//! Stateless bearer tokens: `v1.<payload>.<signature>`, both parts base64url without padding.
//! The signature is HMAC-SHA256 over the encoded payload.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::Role;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION_V1: &str = "v1";
const MAX_TOKEN_LEN: usize = 2048;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token version")]
    UnsupportedVersion,
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("signing key rejected: {0}")]
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Arc<[u8]>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: Arc::from(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload);
        let sig_part = URL_SAFE_NO_PAD.encode(self.sign(&payload_part)?);
        Ok(format!("{TOKEN_VERSION_V1}.{payload_part}.{sig_part}"))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }
        let mut parts = token.split('.');
        let (Some(version), Some(payload_part), Some(sig_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };
        if version != TOKEN_VERSION_V1 {
            return Err(TokenError::UnsupportedVersion);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, payload_part: &str) -> Result<Vec<u8>, TokenError> {
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| TokenError::Key(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", 24)
    }

    #[test]
    fn test_issued_token_verifies() {
        let user_id = Uuid::new_v4();
        let token = signer().issue(user_id, Role::Buyer).unwrap();
        assert!(token.starts_with("v1."));

        let claims = signer().verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Buyer);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = TokenSigner::new("other", 24)
            .issue(Uuid::new_v4(), Role::Admin)
            .unwrap();
        assert_eq!(
            signer().verify(&token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let token = signer().issue(Uuid::new_v4(), Role::Vendor).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Admin,
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(
            signer().verify(&forged).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(25);
        let token = signer()
            .issue_at(Uuid::new_v4(), Role::Buyer, issued)
            .unwrap();
        assert_eq!(signer().verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(signer().verify("garbage").unwrap_err(), TokenError::Malformed);
        assert_eq!(
            signer().verify("v1.a.b.c").unwrap_err(),
            TokenError::Malformed
        );
        assert_eq!(
            signer().verify("v2.a.b").unwrap_err(),
            TokenError::UnsupportedVersion
        );
    }
}
