//! Order API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/orders | POST | any logged-in user |
//! | /api/orders | GET | any logged-in user (customers see own) |
//! | /api/orders/returns | GET | Admin |
//! | /api/orders/{id} | GET | owner / Vendedor / Admin |
//! | /api/orders/{id}/status | PATCH | Vendedor / Admin |
//! | /api/orders/{id}/cancel | POST | owner / Admin |
//! | /api/orders/{id}/return | POST | owner / Admin |

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/returns", get(handler::list_returns))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", patch(handler::update_status))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/return", post(handler::request_return))
}
