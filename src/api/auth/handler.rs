//! Authentication API handlers

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::auth::{LoginInput, LoginResponse, RegisterInput};
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok, ok_with_message};

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterInput>,
) -> AppResult<Json<AppResponse<LoginResponse>>> {
    let session = state.auth_service().register(payload).await?;
    Ok(ok_with_message(session, "Usuário cadastrado com sucesso"))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginInput>,
) -> AppResult<Json<AppResponse<LoginResponse>>> {
    let session = state.auth_service().login(payload).await?;
    Ok(ok(session))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Always answers 200 so the endpoint cannot probe registered e-mails
pub async fn forgot_password(
    State(state): State<ServerState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    state.auth_service().forgot_password(&payload.email).await?;
    Ok(ok_with_message(
        (),
        "Se o e-mail estiver cadastrado, as instruções foram enviadas",
    ))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

pub async fn reset_password(
    State(state): State<ServerState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    state
        .auth_service()
        .reset_password(&payload.token, &payload.password)
        .await?;
    Ok(ok_with_message((), "Senha redefinida com sucesso"))
}
