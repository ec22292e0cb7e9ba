//! Catalog and stock API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/products | GET | public |
//! | /api/products/categories | GET | public |
//! | /api/products/{id} | GET | public |
//! | /api/products/{id}/stock | POST | Vendedor / Admin |
//! | /api/products/{id}/stock-audit | GET | Admin |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", routes())
}

fn routes() -> Router<ServerState> {
    let read_routes = Router::new()
        .route("/", get(handler::list))
        .route("/categories", get(handler::categories))
        .route("/{id}", get(handler::get_by_id));

    let manage_routes = Router::new()
        .route("/{id}/stock", post(handler::add_stock))
        .route("/{id}/stock-audit", get(handler::stock_audit));

    read_routes.merge(manage_routes)
}
