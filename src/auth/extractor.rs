use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};

use super::accountability::resolve_accountability;

const BEARER_SCHEME: &str = "Bearer";

/// ExtractedToken
///
/// Outcome of reading the `Authorization` header. `Absent` means anonymous access,
/// `Invalid` means the client sent something we refuse to interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedToken {
    Absent,
    Invalid,
    Bearer(String),
}

/// Parses an `Authorization` header value. Never fails.
///
/// The scheme must be exactly `Bearer`, followed by one space and a non-empty
/// credential containing no whitespace.
pub fn extract_bearer(header_value: Option<&HeaderValue>) -> ExtractedToken {
    let Some(value) = header_value else {
        return ExtractedToken::Absent;
    };

    let Ok(raw) = value.to_str() else {
        return ExtractedToken::Invalid;
    };

    match raw.split_once(' ') {
        Some((BEARER_SCHEME, token))
            if !token.is_empty() && !token.contains(char::is_whitespace) =>
        {
            ExtractedToken::Bearer(token.to_string())
        }
        _ => ExtractedToken::Invalid,
    }
}

/// RequestToken
///
/// Per-request context populated by [`attach_accountability`] for downstream stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken(pub ExtractedToken);

impl RequestToken {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        RequestToken(extract_bearer(headers.get(header::AUTHORIZATION)))
    }

    /// The raw credential, if a well-formed bearer token was sent.
    pub fn get_token(&self) -> Option<&str> {
        match &self.0 {
            ExtractedToken::Bearer(token) => Some(token),
            ExtractedToken::Absent | ExtractedToken::Invalid => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.0 == ExtractedToken::Invalid
    }
}

/// attach_accountability
///
/// Global middleware: extracts the bearer token and decodes the (unverified) actor,
/// storing both in request extensions. Never rejects a request.
pub async fn attach_accountability(mut request: Request, next: Next) -> Response {
    let token = RequestToken::from_headers(request.headers());
    let actor = resolve_accountability(&token);

    if token.is_invalid() {
        tracing::debug!("authorization header present but not a bearer token");
    }

    request.extensions_mut().insert(actor);
    request.extensions_mut().insert(token);
    next.run(request).await
}
