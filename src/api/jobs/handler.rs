//! Job trigger handlers

use axum::{Json, extract::State};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::SweepReport;
use crate::utils::{AppResponse, AppResult, ok_with_message};

pub async fn run_pending_cancellations(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<SweepReport>>> {
    user.require_admin()?;
    let report = state.order_service().cancel_expired_orders().await?;
    Ok(ok_with_message(
        report,
        "Verificação de pedidos pendentes executada",
    ))
}
