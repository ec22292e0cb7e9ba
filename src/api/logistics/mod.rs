//! Logistics API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/logistics/quote | GET | public |
//! | /api/logistics/orders | GET | Vendedor / Admin |
//! | /api/logistics/{order_id} | GET | owner / Vendedor / Admin |
//! | /api/logistics/{order_id}/status | PUT | Vendedor / Admin |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/logistics", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/quote", get(handler::shipping_quote))
        .route("/orders", get(handler::list_all))
        .route("/{order_id}", get(handler::history))
        .route("/{order_id}/status", put(handler::update_status))
}
