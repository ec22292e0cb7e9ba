//! Authentication middleware
//!
//! Applied at the router level. Validates the `Authorization: Bearer`
//! token for every `/api/` request except the public allowlist and injects
//! [`CurrentUser`] into the request extensions, where the extractor picks
//! it up without re-validating.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::utils::AppError;

/// Routes reachable without a token
fn is_public_api_route(method: &http::Method, path: &str) -> bool {
    if matches!(
        path,
        "/api/auth/login"
            | "/api/auth/register"
            | "/api/auth/forgot-password"
            | "/api/auth/reset-password"
    ) {
        return true;
    }
    // The catalog and the shipping quote are browsable before login
    method == http::Method::GET
        && (path == "/api/products"
            || path.starts_with("/api/products/")
            || path == "/api/logistics/quote")
}

pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    // CORS preflight
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // Non-API paths 404 on their own
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    if is_public_api_route(req.method(), path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::InvalidToken("Invalid authorization header".into()))?,
        None => {
            tracing::warn!(target: "security", uri = %req.uri(), "Missing authorization header");
            return Err(AppError::Unauthorized);
        }
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::try_from(claims)
                .map_err(|e| AppError::InvalidToken(format!("Malformed JWT claims: {e}")))?;
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(target: "security", error = %e, uri = %req.uri(), "Token validation failed");
            match e {
                crate::auth::JwtError::ExpiredToken => Err(AppError::TokenExpired),
                _ => Err(AppError::InvalidToken("Invalid token".into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_allowlist() {
        let get = http::Method::GET;
        let post = http::Method::POST;

        assert!(is_public_api_route(&post, "/api/auth/login"));
        assert!(is_public_api_route(&post, "/api/auth/register"));
        assert!(is_public_api_route(&get, "/api/products"));
        assert!(is_public_api_route(&get, "/api/products/7"));
        assert!(is_public_api_route(&get, "/api/logistics/quote"));

        assert!(!is_public_api_route(&post, "/api/products/7/stock"));
        assert!(!is_public_api_route(&get, "/api/orders"));
        assert!(!is_public_api_route(&post, "/api/orders"));
        assert!(!is_public_api_route(&get, "/api/users/me"));
    }
}
