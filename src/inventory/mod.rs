//! Inventory Manager
//!
//! Manual stock replenishment with its audit ledger, plus the catalog read
//! side. Replenishments come in batches of 10 and never push a product past
//! its `max_stock` ceiling. Decrements happen only through order placement
//! and are deliberately not written to `stock_audit`; they are
//! reconstructable from `order_items` and the cancellation records.

mod catalog;

pub use catalog::{CatalogFilter, CatalogSort};

use crate::auth::CurrentUser;
use crate::db::DbService;
use crate::db::models::{Product, StockAuditRecord};
use crate::utils::{AppError, AppResult, PageQuery, Paginated};

/// Replenishments must come in whole batches of this size
pub const STOCK_BATCH_SIZE: i64 = 10;

#[derive(Clone, Debug)]
pub struct InventoryService {
    db: DbService,
}

impl InventoryService {
    pub fn new(db: DbService) -> Self {
        Self { db }
    }

    pub(crate) fn db(&self) -> &DbService {
        &self.db
    }

    /// Add stock to a product. Staff only; the amount must be a positive
    /// multiple of the batch size and must not push the stock past
    /// `max_stock` when the product has one.
    pub async fn add_stock(
        &self,
        user: &CurrentUser,
        product_id: i64,
        amount: i64,
    ) -> AppResult<Product> {
        user.require_staff()?;

        if amount <= 0 {
            return Err(AppError::InvalidStock(
                "Quantidade deve ser maior que zero".to_string(),
            ));
        }
        if amount % STOCK_BATCH_SIZE != 0 {
            return Err(AppError::InvalidStock(
                "Acréscimo deve ser em lotes de 10 (10, 20, 30...)".to_string(),
            ));
        }

        let mut tx = self.db.write().begin().await?;

        let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
        let product = product
            .ok_or_else(|| AppError::not_found(format!("Produto {product_id} não encontrado")))?;
        if !product.is_active {
            return Err(AppError::ProductInactive(product.name));
        }

        let new_stock = product.stock + amount;
        if let Some(max_stock) = product.max_stock {
            if new_stock > max_stock {
                return Err(AppError::StockLimitExceeded(max_stock));
            }
        }

        sqlx::query("UPDATE products SET stock = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(new_stock)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO stock_audit (product_id, previous_stock, added_amount, new_stock, user_id)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(product.stock)
        .bind(amount)
        .bind(new_stock)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

        let product: Product = sqlx::query_as("SELECT * FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            product_id,
            amount,
            new_stock,
            by = %user.name,
            "Stock replenished"
        );

        Ok(product)
    }

    /// Replenishment history for one product, newest first. Admin only.
    pub async fn stock_audit(
        &self,
        user: &CurrentUser,
        product_id: i64,
        page: PageQuery,
    ) -> AppResult<Paginated<StockAuditRecord>> {
        user.require_admin()?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(self.db.read())
            .await?;
        if exists.is_none() {
            return Err(AppError::not_found(format!(
                "Produto {product_id} não encontrado"
            )));
        }

        let items: Vec<StockAuditRecord> = sqlx::query_as(
            "SELECT a.id, a.previous_stock, a.added_amount, a.new_stock, a.created_at,
                    u.name AS user_name
             FROM stock_audit a
             JOIN users u ON u.id = a.user_id
             WHERE a.product_id = ?
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(product_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.db.read())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_audit WHERE product_id = ?")
            .bind(product_id)
            .fetch_one(self.db.read())
            .await?;

        Ok(Paginated::new(items, page, total))
    }
}
