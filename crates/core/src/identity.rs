use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::blueprint::model::UserId;
use crate::error::{CatalogError, CatalogResult};

/// Resolves an opaque bearer token to the numeric id of the caller.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> CatalogResult<UserId>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user id, as a string.
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
}

/// HS256 verifier over a shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a token for `user_id` valid for `ttl_secs`.
    pub fn issue(&self, user_id: UserId, ttl_secs: u64) -> CatalogResult<String> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + ttl_secs,
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CatalogError::Storage(format!("failed to sign token: {e}")))
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> CatalogResult<UserId> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| CatalogError::Unauthorized(format!("invalid token: {e}")))?;
        data.claims
            .sub
            .parse::<UserId>()
            .map_err(|_| CatalogError::Unauthorized("token subject is not a user id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_tokens_verify() {
        let verifier = JwtVerifier::new("secret");
        let token = verifier.issue(42, 60).unwrap();
        assert_eq!(verifier.verify(&token).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized() {
        let token = JwtVerifier::new("one").issue(42, 60).unwrap();
        assert!(matches!(
            JwtVerifier::new("two").verify(&token).await,
            Err(CatalogError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn garbage_is_unauthorized() {
        assert!(matches!(
            JwtVerifier::new("secret").verify("not.a.token").await,
            Err(CatalogError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn non_numeric_subject_is_unauthorized() {
        let verifier = JwtVerifier::new("secret");
        let claims = Claims {
            sub: "alice".to_string(),
            exp: chrono::Utc::now().timestamp() as u64 + 60,
            iat: 0,
        };
        let token = encode(&Header::default(), &claims, &verifier.encoding).unwrap();
        assert!(matches!(
            verifier.verify(&token).await,
            Err(CatalogError::Unauthorized(_))
        ));
    }
}
