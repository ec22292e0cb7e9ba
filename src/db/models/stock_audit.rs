//! Stock audit ledger model
//!
//! Records manual replenishments only. Decrements from order placement and
//! restorations from cancellation are covered by order_items /
//! order_cancellations / logistics_history instead.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Audit entry joined with the acting user's name, for the history endpoint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockAuditRecord {
    pub id: i64,
    pub previous_stock: i64,
    pub added_amount: i64,
    pub new_stock: i64,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
}
