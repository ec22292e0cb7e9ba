//! Product model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::decimal_column;

/// Catalog product
///
/// `stock` is never negative; if `max_stock` is set, `stock` never exceeds
/// it. Products referenced by orders are soft-deactivated via `is_active`,
/// never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub stock: i64,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub max_stock: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, SqliteRow> for Product {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            price: decimal_column(row, "price")?,
            stock: row.try_get("stock")?,
            image_url: row.try_get("image_url")?,
            is_active: row.try_get("is_active")?,
            max_stock: row.try_get("max_stock")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
