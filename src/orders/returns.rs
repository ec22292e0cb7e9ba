//! Post-delivery return requests
//!
//! The return window counts from the moment the timeline recorded the
//! delivery, never from the order's creation. A defect claim gets 30 days,
//! a no-defect one 7, and each order takes at most one request.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::auth::CurrentUser;
use crate::db::models::{OrderReturn, ReturnType};
use crate::utils::{AppError, AppResult, PageQuery, Paginated};

use super::OrderService;

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnRequestInput {
    pub items: serde_json::Value,
    pub reason: String,
    pub return_type: String,
}

/// Return request joined with the requesting customer, for the admin listing
#[derive(Debug, Clone, Serialize)]
pub struct ReturnRecord {
    #[serde(flatten)]
    pub request: OrderReturn,
    pub customer_name: String,
}

impl FromRow<'_, SqliteRow> for ReturnRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            request: OrderReturn::from_row(row)?,
            customer_name: row.try_get("customer_name")?,
        })
    }
}

impl OrderService {
    /// Open a return request for a delivered order
    pub async fn request_return(
        &self,
        user: &CurrentUser,
        order_id: i64,
        input: ReturnRequestInput,
    ) -> AppResult<OrderReturn> {
        let return_type =
            ReturnType::parse(&input.return_type).ok_or(AppError::InvalidReturnType)?;
        if input.reason.trim().is_empty() {
            return Err(AppError::validation("Motivo da devolução é obrigatório"));
        }
        let valid_items = input
            .items
            .as_array()
            .is_some_and(|items| !items.is_empty());
        if !valid_items {
            return Err(AppError::validation("Itens da devolução são obrigatórios"));
        }

        // Delivery timestamp comes from the timeline, not updated_at: a
        // later edit to the order must not stretch the window.
        let delivered: Option<(i64, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT o.user_id, h.created_at
             FROM orders o
             JOIN logistics_history h ON h.order_id = o.id AND h.status = 'Entregue'
             WHERE o.id = ? AND o.status = 'Entregue'
             ORDER BY h.created_at DESC, h.id DESC
             LIMIT 1",
        )
        .bind(order_id)
        .fetch_optional(self.db().read())
        .await?;
        let (owner_id, delivered_at) = delivered
            .ok_or_else(|| AppError::not_found("Pedido não encontrado ou não entregue"))?;

        if !user.can_access_order(owner_id) {
            return Err(AppError::AccessDenied);
        }

        let days_since_delivery = (Utc::now() - delivered_at).num_days();
        if days_since_delivery > return_type.window_days() {
            return Err(AppError::ReturnPeriodExpired {
                max_days: return_type.window_days(),
                kind: return_type.label().to_string(),
            });
        }

        let items_json = input.items.to_string();
        let inserted = sqlx::query(
            "INSERT INTO order_returns (order_id, items, reason, return_type, status)
             VALUES (?, ?, ?, ?, 'Pending')",
        )
        .bind(order_id)
        .bind(&items_json)
        .bind(input.reason.trim())
        .bind(return_type.as_str())
        .execute(self.db().write())
        .await;

        if let Err(e) = inserted {
            // UNIQUE(order_id): a concurrent request already got through
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return Err(AppError::ReturnAlreadyExists);
                }
            }
            return Err(e.into());
        }

        let request: OrderReturn =
            sqlx::query_as("SELECT * FROM order_returns WHERE order_id = ?")
                .bind(order_id)
                .fetch_one(self.db().read())
                .await?;

        tracing::info!(
            order_id,
            user_id = user.id,
            return_type = return_type.as_str(),
            "Return request opened"
        );

        Ok(request)
    }

    /// Admin listing of return requests, newest first, optionally filtered
    /// by processing status (Pending, Approved, Rejected, Processed)
    pub async fn list_returns(
        &self,
        user: &CurrentUser,
        status: Option<&str>,
        page: PageQuery,
    ) -> AppResult<Paginated<ReturnRecord>> {
        user.require_admin()?;

        if let Some(status) = status {
            if !matches!(status, "Pending" | "Approved" | "Rejected" | "Processed") {
                return Err(AppError::InvalidStatus(status.to_string()));
            }
        }

        let mut qb: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new(
            "SELECT r.*, u.name AS customer_name
             FROM order_returns r
             JOIN orders o ON o.id = r.order_id
             JOIN users u ON u.id = o.user_id
             WHERE 1 = 1",
        );
        let mut count_qb: sqlx::QueryBuilder<sqlx::Sqlite> =
            sqlx::QueryBuilder::new("SELECT COUNT(*) FROM order_returns r WHERE 1 = 1");
        if let Some(status) = status {
            for b in [&mut qb, &mut count_qb] {
                b.push(" AND r.status = ").push_bind(status);
            }
        }
        qb.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items: Vec<ReturnRecord> = qb.build_query_as().fetch_all(self.db().read()).await?;
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.db().read())
            .await?;

        Ok(Paginated::new(items, page, total))
    }
}
