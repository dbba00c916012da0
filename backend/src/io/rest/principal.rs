//! Resolution of the authenticated caller.
//!
//! An upstream authenticator stores a [`Principal`] in the request
//! extensions. Deployments behind a trusted gateway can instead install
//! [`principal_from_headers`], which maps `x-principal-role` and
//! `x-principal-id` to a principal. Handlers take `Principal` as an
//! extractor; a request without one is rejected with 401.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use shared::ErrorResponse;
use tracing::debug;

use crate::domain::models::principal::Principal;

pub const ROLE_HEADER: &str = "x-principal-role";
pub const ID_HEADER: &str = "x-principal-id";

/// Principal described by the gateway headers, if both are present and valid
pub fn principal_from_header_map(headers: &HeaderMap) -> Option<Principal> {
    let role = headers.get(ROLE_HEADER)?.to_str().ok()?;
    let id = headers.get(ID_HEADER)?.to_str().ok()?.trim().parse::<i64>().ok()?;

    match role.trim().to_ascii_lowercase().as_str() {
        "student" => Some(Principal::Student { id }),
        "staff" => Some(Principal::Staff { id }),
        _ => None,
    }
}

/// Middleware inserting the header-described principal into the request
pub async fn principal_from_headers(mut request: Request, next: Next) -> Response {
    if request.extensions().get::<Principal>().is_none() {
        if let Some(principal) = principal_from_header_map(request.headers()) {
            debug!("Resolved principal from headers: {:?}", principal);
            request.extensions_mut().insert(principal);
        }
    }
    next.run(request).await
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Principal>().copied().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    message: "Authentication required".to_string(),
                }),
            )
                .into_response()
        })
    }
}
