//! Automatic expiry of unpaid orders
//!
//! Orders stuck in "Aguardando Pagamento" past the grace period are
//! cancelled through the same path as a customer cancellation, so stock is
//! restored and the timeline stays complete. Runs from the background
//! scheduler and from the manual admin trigger.

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::db::models::sqlite_timestamp;
use crate::utils::AppResult;

use super::OrderService;
use super::lifecycle::apply_cancellation;

/// How long an order may wait for payment before it is cancelled
pub const PENDING_PAYMENT_GRACE_HOURS: i64 = 72;

pub const AUTO_CANCEL_REASON: &str = "Pagamento não confirmado em 72h";

/// Outcome of one sweep run
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub cancelled_count: usize,
    pub cancelled_orders: Vec<i64>,
    pub executed_at: chrono::DateTime<Utc>,
}

impl OrderService {
    /// Cancel every order awaiting payment for longer than the grace period
    pub async fn cancel_expired_orders(&self) -> AppResult<SweepReport> {
        self.cancel_expired_orders_with_grace(PENDING_PAYMENT_GRACE_HOURS)
            .await
    }

    pub async fn cancel_expired_orders_with_grace(
        &self,
        grace_hours: i64,
    ) -> AppResult<SweepReport> {
        let cutoff = sqlite_timestamp(Utc::now() - Duration::hours(grace_hours));

        let expired: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM orders
             WHERE status = 'Aguardando Pagamento' AND datetime(created_at) < datetime(?)
             ORDER BY id",
        )
        .bind(&cutoff)
        .fetch_all(self.db().read())
        .await?;

        let note = format!("Cancelado automaticamente: {AUTO_CANCEL_REASON}");
        let mut cancelled_orders = Vec::with_capacity(expired.len());

        // One transaction per order: a failure on one order must not hold
        // back the rest of the sweep.
        for order_id in expired {
            let result: AppResult<()> = async {
                let mut tx = self.db().write().begin().await?;
                apply_cancellation(&mut tx, order_id, AUTO_CANCEL_REASON, &note).await?;
                tx.commit().await?;
                Ok(())
            }
            .await;

            match result {
                Ok(()) => cancelled_orders.push(order_id),
                // The order may have been paid or cancelled between the
                // candidate query and this transaction; skip it.
                Err(e) => {
                    tracing::warn!(order_id, error = %e, "Expiry sweep skipped order");
                }
            }
        }

        let report = SweepReport {
            cancelled_count: cancelled_orders.len(),
            cancelled_orders,
            executed_at: Utc::now(),
        };

        if report.cancelled_count > 0 {
            tracing::info!(
                cancelled = report.cancelled_count,
                orders = ?report.cancelled_orders,
                "Expiry sweep cancelled unpaid orders"
            );
        } else {
            tracing::debug!("Expiry sweep found no expired orders");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{OrderStatus, Role};
    use crate::db::testutil::*;
    use crate::orders::{CreateOrderInput, OrderLineInput, StatusChange};
    use rust_decimal_macros::dec;

    async fn setup_with_order() -> (
        crate::db::DbService,
        OrderService,
        crate::auth::CurrentUser,
        i64,
        i64,
    ) {
        let db = mem_db().await;
        let service = OrderService::new(db.clone());
        let user_id = seed_user(&db, "Maria", "maria@example.com", Role::Cliente).await;
        let user = current_user(user_id, "Maria", Role::Cliente);
        let address_id = seed_address(&db, user_id).await;
        let product_id = seed_product(&db, "Fone", dec!(120.00), 10, None).await;
        let created = service
            .create_order(
                &user,
                CreateOrderInput {
                    address_id,
                    payment_method: "pix".into(),
                    items: vec![OrderLineInput { product_id, qty: 2 }],
                },
            )
            .await
            .unwrap();
        (db, service, user, created.order.id, product_id)
    }

    #[tokio::test]
    async fn test_sweep_cancels_only_expired_pending_orders() {
        let (db, service, user, order_id, product_id) = setup_with_order().await;
        assert_eq!(product_stock(&db, product_id).await, 8);

        // Fresh order: untouched
        let report = service.cancel_expired_orders().await.unwrap();
        assert_eq!(report.cancelled_count, 0);

        backdate_order(&db, order_id, "2024-01-01 08:00:00").await;
        let report = service.cancel_expired_orders().await.unwrap();
        assert_eq!(report.cancelled_count, 1);
        assert_eq!(report.cancelled_orders, vec![order_id]);

        let detail = service.get_order(&user, order_id).await.unwrap();
        assert_eq!(detail.order.status, OrderStatus::Cancelled);
        assert_eq!(product_stock(&db, product_id).await, 10);

        let reason: String =
            sqlx::query_scalar("SELECT reason FROM order_cancellations WHERE order_id = ?")
                .bind(order_id)
                .fetch_one(db.read())
                .await
                .unwrap();
        assert_eq!(reason, "Pagamento não confirmado em 72h");
        let last = detail.history.last().unwrap();
        assert_eq!(
            last.note.as_deref(),
            Some("Cancelado automaticamente: Pagamento não confirmado em 72h")
        );

        // Idempotent: a second sweep finds nothing
        let report = service.cancel_expired_orders().await.unwrap();
        assert_eq!(report.cancelled_count, 0);
    }

    #[tokio::test]
    async fn test_sweep_spares_paid_orders() {
        let (db, service, _user, order_id, product_id) = setup_with_order().await;
        let staff = current_user(
            seed_user(&db, "Carlos", "carlos@example.com", Role::Vendedor).await,
            "Carlos",
            Role::Vendedor,
        );
        service
            .update_status(
                &staff,
                order_id,
                StatusChange { status: "Pago".into(), note: None },
            )
            .await
            .unwrap();
        backdate_order(&db, order_id, "2024-01-01 08:00:00").await;

        let report = service.cancel_expired_orders().await.unwrap();
        assert_eq!(report.cancelled_count, 0);
        assert_eq!(product_stock(&db, product_id).await, 8);
    }

    #[tokio::test]
    async fn test_sweep_grace_boundary() {
        let (db, service, _user, order_id, _product_id) = setup_with_order().await;
        // Just inside the window
        let inside = sqlite_timestamp(Utc::now() - Duration::hours(71));
        backdate_order(&db, order_id, &inside).await;
        let report = service.cancel_expired_orders().await.unwrap();
        assert_eq!(report.cancelled_count, 0);

        // Just past it
        let outside = sqlite_timestamp(Utc::now() - Duration::hours(73));
        backdate_order(&db, order_id, &outside).await;
        let report = service.cancel_expired_orders().await.unwrap();
        assert_eq!(report.cancelled_count, 1);
    }
}
