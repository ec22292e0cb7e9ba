//! Catalog and stock API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Product, StockAuditRecord};
use crate::inventory::CatalogFilter;
use crate::utils::{AppResponse, AppResult, PageQuery, Paginated, ok, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub sort: crate::inventory::CatalogSort,
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
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Paginated<Product>>>> {
    let filter = CatalogFilter {
        q: query.q,
        category: query.category,
        sort: query.sort,
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let page = state.inventory_service().list_products(&filter, page).await?;
    Ok(ok(page))
}

pub async fn categories(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<String>>>> {
    let categories = state.inventory_service().list_categories().await?;
    Ok(ok(categories))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AppResponse<Product>>> {
    let product = state.inventory_service().get_product(id).await?;
    Ok(ok(product))
}

#[derive(Debug, Deserialize)]
pub struct AddStockRequest {
    pub amount: i64,
}

pub async fn add_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AddStockRequest>,
) -> AppResult<Json<AppResponse<Product>>> {
    let product = state
        .inventory_service()
        .add_stock(&user, id, payload.amount)
        .await?;
    Ok(ok_with_message(product, "Estoque atualizado com sucesso"))
}

pub async fn stock_audit(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<AppResponse<Paginated<StockAuditRecord>>>> {
    let history = state
        .inventory_service()
        .stock_audit(&user, id, page)
        .await?;
    Ok(ok(history))
}
