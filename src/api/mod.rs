//! API route modules
//!
//! One module per area, each exposing a `router()` that is merged into the
//! application router in [`build_app`]:
//!
//! - [`health`]: liveness probe (public)
//! - [`auth`]: register / login / password reset
//! - [`users`]: profile and address book
//! - [`products`]: catalog reads, stock replenishment, stock audit
//! - [`orders`]: order lifecycle, cancellation, returns
//! - [`logistics`]: per-order timeline, status updates, shipping quote
//! - [`jobs`]: manual triggers for the periodic jobs

pub mod auth;
pub mod health;
pub mod jobs;
pub mod logistics;
pub mod orders;
pub mod products;
pub mod users;

use axum::{Router, middleware};
use http::HeaderName;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

use crate::core::ServerState;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone, Copy, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// HTTP access log middleware
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());

    response
}

/// Build the router without state or middleware
pub fn build_router() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(logistics::router())
        .merge(jobs::router())
}

/// Build the full application: routes, authentication and the tower-http
/// layer stack
pub fn build_app(state: ServerState) -> Router {
    build_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
        .layer(middleware::from_fn(log_request))
}
