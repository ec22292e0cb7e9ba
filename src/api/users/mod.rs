//! User profile and address book API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/users/me | GET | any logged-in user |
//! | /api/users/addresses | GET | any logged-in user |
//! | /api/users/addresses | POST | any logged-in user |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/users", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/me", get(handler::me))
        .route(
            "/addresses",
            get(handler::list_addresses).post(handler::create_address),
        )
}
