use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AuthError
///
/// The only failures the auth pipeline surfaces. Messages are deliberately uniform:
/// clients learn that a token was rejected, never which check rejected it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token was not provided")]
    MissingToken,
    #[error("jwt expired or not valid")]
    InvalidToken,
    #[error("forbidden resource")]
    Forbidden,
    /// Minting failed; only reachable through operator tooling.
    #[error("could not issue token")]
    Issue,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Issue => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "statusCode": self.status().as_u16(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
