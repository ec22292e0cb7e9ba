//! Manual job triggers
//!
//! The periodic jobs also run on a schedule; these endpoints let an admin
//! force a run and read the outcome.
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/jobs/pending-cancellations | POST | Admin |

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/jobs", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route(
        "/pending-cancellations",
        post(handler::run_pending_cancellations),
    )
}
