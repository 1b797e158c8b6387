use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::error::{AppError, AppResult};
use crate::models::Role;

type HmacSha256 = Hmac<Sha256>;

/// Bearer tokens expire a day after issue.
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub role: Role,
    pub exp: i64,
}

/// HMAC-SHA256 signing key for bearer tokens. Tokens are
/// `base64url(json claims) "." base64url(signature)`.
#[derive(Clone)]
pub struct AuthKeys {
    secret: Arc<[u8]>,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: &str, role: Role) -> AppResult<String> {
        let claims = Claims {
            id: user_id.to_owned(),
            role,
            exp: OffsetDateTime::now_utc().unix_timestamp() + TOKEN_TTL_SECS,
        };
        let payload = serde_json::to_vec(&claims).map_err(anyhow::Error::from)?;
        let sig = self.sign(&payload)?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    fn sign(&self, payload: &[u8]) -> AppResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| anyhow::anyhow!("hmac key: {e}"))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let invalid = || AppError::Unauthorized("Invalid token".to_owned());

        let (payload_b64, sig_b64) = token.split_once('.').ok_or_else(invalid)?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| invalid())?;
        let sig = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| invalid())?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| anyhow::anyhow!("hmac key: {e}"))?;
        mac.update(&payload);
        mac.verify_slice(&sig).map_err(|_| invalid())?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| invalid())?;
        if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
            return Err(AppError::Unauthorized("Token expired".to_owned()));
        }
        Ok(claims)
    }
}

/// The `(user id, role)` resolved from the bearer token. Handlers take this
/// as an extractor; everything below the handler layer trusts it.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role != role {
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_owned(),
            ));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = AuthKeys::from_ref(state);

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_owned()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_owned()))?;

        let claims = keys.verify(token)?;
        Ok(AuthUser {
            id: claims.id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify() {
        let keys = AuthKeys::new("test-secret");
        let token = keys.issue("u1", Role::Patient).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.id, "u1");
        assert_eq!(claims.role, Role::Patient);
    }

    #[test]
    fn tampered_payload_rejected() {
        let keys = AuthKeys::new("test-secret");
        let token = keys.issue("u1", Role::Patient).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged_claims = serde_json::json!({
            "id": "u1",
            "role": "PATHOLOGIST",
            "exp": i64::MAX,
        });
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap()),
            sig
        );
        assert!(matches!(
            keys.verify(&forged),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn wrong_key_rejected() {
        let token = AuthKeys::new("a").issue("u1", Role::Student).unwrap();
        assert!(AuthKeys::new("b").verify(&token).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let keys = AuthKeys::new("test-secret");
        let claims = Claims {
            id: "u1".to_owned(),
            role: Role::Patient,
            exp: OffsetDateTime::now_utc().unix_timestamp() - 10,
        };
        let payload = serde_json::to_vec(&claims).unwrap();
        let mut mac = HmacSha256::new_from_slice(b"test-secret").unwrap();
        mac.update(&payload);
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        );
        assert!(matches!(
            keys.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
