//! Order API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Order, OrderReturn};
use crate::orders::{
    CreateOrderInput, CreatedOrder, OrderDetail, OrderFilter, OrderSummary, ReturnRecord,
    ReturnRequestInput, StatusChange,
};
use crate::utils::{AppResponse, AppResult, PageQuery, Paginated, ok, ok_with_message};

pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateOrderInput>,
) -> AppResult<Json<AppResponse<CreatedOrder>>> {
    let created = state.order_service().create_order(&user, payload).await?;
    Ok(ok_with_message(created, "Pedido criado com sucesso"))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Paginated<OrderSummary>>>> {
    let filter = OrderFilter {
        status: query.status,
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let orders = state
        .order_service()
        .list_orders(&user, &filter, page)
        .await?;
    Ok(ok(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<OrderDetail>>> {
    let detail = state.order_service().get_order(&user, id).await?;
    Ok(ok(detail))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<StatusChange>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state
        .order_service()
        .update_status(&user, id, payload)
        .await?;
    Ok(ok_with_message(order, "Status atualizado com sucesso"))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state
        .order_service()
        .cancel_order(&user, id, &payload.reason)
        .await?;
    Ok(ok_with_message(order, "Pedido cancelado com sucesso"))
}

pub async fn request_return(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ReturnRequestInput>,
) -> AppResult<Json<AppResponse<OrderReturn>>> {
    let request = state
        .order_service()
        .request_return(&user, id, payload)
        .await?;
    Ok(ok_with_message(
        request,
        "Solicitação de devolução registrada",
    ))
}

pub async fn list_returns(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Paginated<ReturnRecord>>>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let returns = state
        .order_service()
        .list_returns(&user, query.status.as_deref(), page)
        .await?;
    Ok(ok(returns))
}
