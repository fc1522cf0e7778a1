//! Account credential extraction
//!
//! Requests carry the account API credential as `Authorization: Bearer ...`.
//! A missing header is not rejected here; the service falls back to the
//! configured token and only then reports a missing credential.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

/// Bearer credential from the request, if one was sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerCredential(pub Option<String>);

impl BearerCredential {
    /// Token part of an `Authorization` header value
    pub fn extract_token(authorization: &str) -> Option<&str> {
        let (scheme, token) = authorization.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Some(token.trim()).filter(|t| !t.is_empty())
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for BearerCredential
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::extract_token)
            .map(str::to_string);

        Ok(BearerCredential(token))
    }
}
