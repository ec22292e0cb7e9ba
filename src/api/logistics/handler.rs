//! Logistics API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{LogisticsEntry, Order};
use crate::orders::{
    FREE_SHIPPING_THRESHOLD, OrderFilter, OrderSummary, StatusChange, shipping_cost,
};
use crate::utils::{AppResponse, AppResult, PageQuery, Paginated, ok, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ShippingQuote {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub free_shipping_threshold: Decimal,
}

/// Shipping quote for a cart subtotal. Public: carts are quoted before
/// checkout, with no order involved.
pub async fn shipping_quote(
    Query(query): Query<QuoteQuery>,
) -> AppResult<Json<AppResponse<ShippingQuote>>> {
    let cost = shipping_cost(query.subtotal);
    Ok(ok(ShippingQuote {
        subtotal: query.subtotal,
        shipping_cost: cost,
        total: query.subtotal + cost,
        free_shipping_threshold: FREE_SHIPPING_THRESHOLD,
    }))
}

pub async fn history(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<i64>,
) -> AppResult<Json<AppResponse<Vec<LogisticsEntry>>>> {
    let detail = state.order_service().get_order(&user, order_id).await?;
    Ok(ok(detail.history))
}

/// Same transition engine as the order status endpoint, exposed where the
/// logistics screens expect it and accepting a custom note
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(order_id): Path<i64>,
    Json(payload): Json<StatusChange>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state
        .order_service()
        .update_status(&user, order_id, payload)
        .await?;
    Ok(ok_with_message(order, "Status atualizado com sucesso"))
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

/// Every order in the system, for the logistics back office
pub async fn list_all(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Paginated<OrderSummary>>>> {
    user.require_staff()?;
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
