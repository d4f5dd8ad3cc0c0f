use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::{
    accountability::{Accountability, Claims},
    error::AuthError,
    extractor::{ExtractedToken, RequestToken},
};
use crate::{config::AppConfig, roles::Role};

/// TokenVerifier
///
/// Holds the HS256 keys derived from the shared secret. Built once at startup from
/// `AppConfig` and shared through the application state.
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

/// Shared handle used by extractors and middleware.
pub type TokenVerifierState = Arc<TokenVerifier>;

impl TokenVerifier {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is a hard cut-off.
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    /// verify
    ///
    /// Succeeds only for a correctly signed, unexpired token. Every failure maps to the
    /// same `InvalidToken` error; the precise cause is logged, not returned.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(kind = ?e.kind(), "bearer token rejected");
                AuthError::InvalidToken
            })
    }

    /// Hard gate over the per-request token context.
    pub fn verify_request(&self, token: &RequestToken) -> Result<Claims, AuthError> {
        match &token.0 {
            ExtractedToken::Absent => Err(AuthError::MissingToken),
            ExtractedToken::Invalid => Err(AuthError::InvalidToken),
            ExtractedToken::Bearer(raw) => self.verify(raw),
        }
    }

    /// Signs arbitrary claims with the shared secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("failed to encode token: {:?}", e);
            AuthError::Issue
        })
    }

    /// issue
    ///
    /// Mints a token for `subject` carrying the capability flags of `role`, valid for
    /// the configured lifetime starting at `now`.
    pub fn issue(
        &self,
        subject: Uuid,
        role: &Role,
        scope: &str,
        now: SystemTime,
    ) -> Result<String, AuthError> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::Issue)?
            .as_secs();

        let exp = iat.checked_add(self.ttl_secs).ok_or_else(|| {
            tracing::error!(ttl_secs = self.ttl_secs, "token lifetime overflows the expiry claim");
            AuthError::Issue
        })?;

        let claims = Claims {
            sub: subject,
            admin: role.admin_access,
            app_access: role.app_access,
            role: role.id.as_str().to_string(),
            scope: scope.to_string(),
            iat,
            exp,
        };
        self.sign(&claims)
    }
}

/// VerifiedActor
///
/// Extractor for routes that require confirmed identity. Rejects with 401 unless the
/// bearer token verifies against the shared secret.
#[derive(Debug, Clone)]
pub struct VerifiedActor(pub Accountability);

impl<S> FromRequestParts<S> for VerifiedActor
where
    S: Send + Sync,
    TokenVerifierState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = TokenVerifierState::from_ref(state);

        let claims = match parts.extensions.get::<RequestToken>() {
            Some(token) => verifier.verify_request(token)?,
            None => verifier.verify_request(&RequestToken::from_headers(&parts.headers))?,
        };

        Ok(VerifiedActor(Accountability::from(claims)))
    }
}
