use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};

/// Claims we rely on; `sub` carries the uid
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Bearer token verifier
///
/// The uid is taken from `sub` and trusted as-is once the signature and
/// expiry check out.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, issuer: Option<&str>, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Resolve the uid behind a bearer token
    pub fn authenticate(&self, token: &str) -> MatchResult<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired".to_string(),
                ErrorKind::InvalidSignature => "invalid signature".to_string(),
                other => format!("invalid token: {:?}", other),
            };
            MatchError::AuthenticationFailed(reason)
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(MatchError::AuthenticationFailed("missing subject".into()));
        }

        Ok(data.claims.sub)
    }

    /// Extract the token from an `Authorization` header value
    pub fn bearer_token(header: Option<&str>) -> MatchResult<&str> {
        header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MatchError::AuthenticationFailed("missing bearer token".into()))
    }
}
