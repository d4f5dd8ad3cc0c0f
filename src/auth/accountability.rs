use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::dangerous::insecure_decode;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use super::extractor::RequestToken;

/// Claims
///
/// Payload of the portal's bearer tokens. Untrusted until checked by the
/// [`TokenVerifier`](super::verifier::TokenVerifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub admin: bool,
    pub app_access: bool,
    pub role: String,
    #[serde(default)]
    pub scope: String,
    pub iat: u64,
    pub exp: u64,
}

/// UnverifiedClaims
///
/// What the soft path reads from a token body. Only `sub` is required: timestamps
/// are ignored and missing capability flags count as not granted.
#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    sub: Uuid,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    app_access: bool,
    #[serde(default)]
    role: String,
    #[serde(default)]
    scope: String,
}

/// Accountability
///
/// The request actor. Lives for one request and is never persisted. Handlers read it
/// to decide ownership and visibility; its shape is part of the API contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Accountability {
    pub id: Uuid,
    pub is_admin: bool,
    pub has_app_access: bool,
    pub role: String,
    pub scope: String,
}

impl From<Claims> for Accountability {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            is_admin: claims.admin,
            has_app_access: claims.app_access,
            role: claims.role,
            scope: claims.scope,
        }
    }
}

/// decode_unverified
///
/// Reads the actor from an HS256 token body without checking the signature or expiry.
/// The result carries no trust and must not gate a mutation on its own.
pub fn decode_unverified(token: &str) -> Option<Accountability> {
    match insecure_decode::<UnverifiedClaims>(token) {
        Ok(data) => {
            let claims = data.claims;
            Some(Accountability {
                id: claims.sub,
                is_admin: claims.admin,
                has_app_access: claims.app_access,
                role: claims.role,
                scope: claims.scope,
            })
        }
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "bearer token could not be decoded");
            None
        }
    }
}

/// resolve_accountability
///
/// Soft auth: who is calling, if anyone. Absent, invalid, or undecodable tokens all
/// resolve to `None`; this function never fails.
pub fn resolve_accountability(token: &RequestToken) -> Option<Accountability> {
    token
        .get_token()
        .and_then(decode_unverified)
}

/// OptionalActor
///
/// Extractor for the soft actor attached by the accountability middleware.
/// Falls back to decoding the header itself when the middleware is not installed.
#[derive(Debug, Clone)]
pub struct OptionalActor(pub Option<Accountability>);

impl<S> FromRequestParts<S> for OptionalActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Option<Accountability>>() {
            return Ok(OptionalActor(actor.clone()));
        }
        let token = RequestToken::from_headers(&parts.headers);
        Ok(OptionalActor(resolve_accountability(&token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractor::ExtractedToken;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn claims() -> Claims {
        Claims {
            sub: Uuid::from_u128(7),
            admin: false,
            app_access: true,
            role: "citizen".to_string(),
            scope: "portal".to_string(),
            iat: 1,
            // Long expired.
            exp: 2,
        }
    }

    fn signed(secret: &str) -> String {
        encode(
            &Header::default(),
            &claims(),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decodes_claims_regardless_of_signature_or_expiry() {
        let token = signed("some-other-secret");
        let actor = resolve_accountability(&RequestToken(ExtractedToken::Bearer(token))).unwrap();

        assert_eq!(actor.id, Uuid::from_u128(7));
        assert!(!actor.is_admin);
        assert!(actor.has_app_access);
        assert_eq!(actor.role, "citizen");
        assert_eq!(actor.scope, "portal");
    }

    #[test]
    fn decodes_tokens_without_timestamps() {
        let body = serde_json::json!({
            "sub": Uuid::from_u128(9),
            "admin": false,
            "app_access": true,
            "role": "citizen",
            "scope": "portal",
        });
        let token = encode(&Header::default(), &body, &EncodingKey::from_secret(b"k")).unwrap();

        let actor = resolve_accountability(&RequestToken(ExtractedToken::Bearer(token))).unwrap();
        assert_eq!(actor.id, Uuid::from_u128(9));
        assert!(actor.has_app_access);
        assert_eq!(actor.scope, "portal");
    }

    #[test]
    fn missing_flags_are_not_granted() {
        let body = serde_json::json!({ "sub": Uuid::from_u128(3) });
        let token = encode(&Header::default(), &body, &EncodingKey::from_secret(b"k")).unwrap();

        let actor = decode_unverified(&token).unwrap();
        assert!(!actor.is_admin);
        assert!(!actor.has_app_access);
        assert_eq!(actor.role, "");
    }

    #[test]
    fn garbage_resolves_to_no_actor() {
        for raw in ["", "not-a-jwt", "a.b.c", "....", "eyJhbGciOiJIUzI1NiJ9.e30.", "🙃.🙃.🙃"] {
            let token = RequestToken(ExtractedToken::Bearer(raw.to_string()));
            assert!(resolve_accountability(&token).is_none(), "{raw}");
        }
    }

    #[test]
    fn absent_and_invalid_tokens_resolve_to_no_actor() {
        assert!(resolve_accountability(&RequestToken(ExtractedToken::Absent)).is_none());
        assert!(resolve_accountability(&RequestToken(ExtractedToken::Invalid)).is_none());
    }

    #[test]
    fn actor_serializes_with_camel_case_fields() {
        let actor = Accountability::from(claims());
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["isAdmin"], false);
        assert_eq!(json["hasAppAccess"], true);
    }
}
