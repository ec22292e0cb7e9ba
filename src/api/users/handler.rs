//! User API handlers

use axum::{Json, extract::State};

use crate::auth::{AddressInput, CurrentUser, UserProfile};
use crate::core::ServerState;
use crate::db::models::Address;
use crate::utils::{AppResponse, AppResult, ok, ok_with_message};

pub async fn me(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<UserProfile>>> {
    let profile = state.auth_service().profile(&user).await?;
    Ok(ok(profile))
}

pub async fn list_addresses(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<Vec<Address>>>> {
    let addresses = state.auth_service().list_addresses(&user).await?;
    Ok(ok(addresses))
}

pub async fn create_address(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<AddressInput>,
) -> AppResult<Json<AppResponse<Address>>> {
    let address = state.auth_service().create_address(&user, payload).await?;
    Ok(ok_with_message(address, "Endereço cadastrado com sucesso"))
}
