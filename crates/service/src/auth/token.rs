use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use super::domain::{TokenClaims, TokenPayload};
use super::errors::AuthError;

/// Default token lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Issues and checks bearer tokens. Stateless: nothing is remembered between calls.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, payload: &TokenPayload) -> Result<String, AuthError>;
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError>;
    fn ttl(&self) -> Duration;
}

/// HS256 JWT signer bound to one shared secret.
#[derive(Clone)]
pub struct JwtSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, payload: &TokenPayload) -> Result<String, AuthError> {
        let iat = usize::try_from(Utc::now().timestamp())
            .map_err(|e| AuthError::TokenError(format!("clock before epoch: {e}")))?;
        let exp = usize::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or_else(|| AuthError::TokenError(format!("token ttl {}s overflows exp", self.ttl.as_secs())))?;
        let claims = TokenClaims { username: payload.username.clone(), iat, exp };
        debug!(username = %claims.username, exp = claims.exp, "signing token");
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(username: &str) -> TokenPayload {
        TokenPayload { username: username.into() }
    }

    #[test]
    fn signed_token_verifies_with_same_secret() {
        let signer = JwtSigner::new("test-secret-key-12345", DEFAULT_TTL);
        let token = signer.sign(&payload("alice")).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.exp > Utc::now().timestamp() as usize);
    }

    #[test]
    fn different_secret_rejects() {
        let a = JwtSigner::new("secret1", DEFAULT_TTL);
        let b = JwtSigner::new("secret2", DEFAULT_TTL);
        let token = a.sign(&payload("alice")).unwrap();
        assert!(matches!(b.verify(&token), Err(AuthError::TokenError(_))));
    }

    #[test]
    fn expired_token_rejects() {
        let signer = JwtSigner::new("secret", DEFAULT_TTL);
        let past = Utc::now().timestamp() as usize - 7200;
        let stale = TokenClaims { username: "alice".into(), iat: past, exp: past + 60 };
        let token = encode(&Header::default(), &stale, &EncodingKey::from_secret(b"secret")).unwrap();
        assert!(signer.verify(&token).is_err());
    }

    #[test]
    fn oversized_ttl_is_a_token_error() {
        let signer = JwtSigner::new("secret", Duration::from_secs(u64::MAX));
        assert!(matches!(signer.sign(&payload("alice")), Err(AuthError::TokenError(_))));
    }

    #[test]
    fn garbage_rejects() {
        let signer = JwtSigner::new("secret", Duration::from_secs(60));
        assert!(signer.verify("invalid.token.here").is_err());
        assert_eq!(signer.ttl(), Duration::from_secs(60));
    }
}
