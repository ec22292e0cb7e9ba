//! Order creation, queries, status changes and cancellation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite, Transaction, sqlite::SqliteRow};

use crate::auth::CurrentUser;
use crate::db::models::{LogisticsEntry, Order, OrderItem, OrderStatus, Product, decimal_column};
use crate::utils::{AppError, AppResult, PageQuery, Paginated};

use super::OrderService;

/// Orders at or above this subtotal ship for free
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(39900, 0, 0, false, 2);
pub const FLAT_SHIPPING_COST: Decimal = Decimal::from_parts(10000, 0, 0, false, 2);

/// Shipping cost for a given items subtotal: free at or above the
/// threshold, a flat fee below it. Shipping never counts towards the
/// threshold itself.
pub fn shipping_cost(subtotal: Decimal) -> Decimal {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING_COST
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineInput {
    pub product_id: i64,
    pub qty: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub address_id: i64,
    pub payment_method: String,
    pub items: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// One line of an order detail, joined with the current product name
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDetail {
    pub product_id: i64,
    pub product_name: String,
    pub qty: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl sqlx::FromRow<'_, SqliteRow> for OrderItemDetail {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let qty: i64 = row.try_get("qty")?;
        let unit_price = decimal_column(row, "unit_price")?;
        Ok(Self {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            qty,
            unit_price,
            line_total: unit_price * Decimal::from(qty),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
    pub history: Vec<LogisticsEntry>,
}

/// Listing row, without items
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub total: Decimal,
    pub shipping_cost: Decimal,
    pub item_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl sqlx::FromRow<'_, SqliteRow> for OrderSummary {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status_raw: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "status".into(),
            source: format!("unknown order status '{status_raw}'").into(),
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            status,
            total: decimal_column(row, "total")?,
            shipping_cost: decimal_column(row, "shipping_cost")?,
            item_count: row.try_get("item_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
}

impl OrderService {
    /// Create an order for the authenticated user.
    ///
    /// Price and stock are read inside the same write transaction that
    /// decrements stock, so a concurrent order cannot oversell: whichever
    /// transaction runs second sees the already-reduced stock.
    pub async fn create_order(
        &self,
        user: &CurrentUser,
        input: CreateOrderInput,
    ) -> AppResult<CreatedOrder> {
        if input.items.is_empty() {
            return Err(AppError::validation("Itens do pedido são obrigatórios"));
        }
        if input.payment_method.trim().is_empty() {
            return Err(AppError::validation("Forma de pagamento é obrigatória"));
        }
        for line in &input.items {
            if line.qty <= 0 {
                return Err(AppError::validation("Quantidade deve ser maior que zero"));
            }
        }

        let address: Option<i64> =
            sqlx::query_scalar("SELECT id FROM addresses WHERE id = ? AND user_id = ?")
                .bind(input.address_id)
                .bind(user.id)
                .fetch_optional(self.db().read())
                .await?;
        if address.is_none() {
            return Err(AppError::not_found("Endereço não encontrado"));
        }

        let mut tx = self.db().write().begin().await?;

        let mut lines: Vec<(Product, i64)> = Vec::with_capacity(input.items.len());
        let mut subtotal = Decimal::ZERO;
        for line in &input.items {
            let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?")
                .bind(line.product_id)
                .fetch_optional(&mut *tx)
                .await?;
            let product = product.ok_or_else(|| {
                AppError::not_found(format!("Produto {} não encontrado", line.product_id))
            })?;
            if !product.is_active {
                return Err(AppError::ProductInactive(product.name));
            }
            if product.stock < line.qty {
                return Err(AppError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                });
            }
            subtotal += product.price * Decimal::from(line.qty);
            lines.push((product, line.qty));
        }

        let shipping = shipping_cost(subtotal);
        let total = subtotal + shipping;

        let order_id = sqlx::query(
            "INSERT INTO orders (user_id, address_id, payment_method, total, shipping_cost, status, financial_status)
             VALUES (?, ?, ?, ?, ?, 'Aguardando Pagamento', 'Pendente')",
        )
        .bind(user.id)
        .bind(input.address_id)
        .bind(&input.payment_method)
        .bind(total.to_string())
        .bind(shipping.to_string())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (product, qty) in &lines {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, qty, unit_price) VALUES (?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(product.id)
            .bind(qty)
            .bind(product.price.to_string())
            .execute(&mut *tx)
            .await?;

            // Guarded decrement. The per-line checks above all ran against
            // the pre-decrement stock, so several lines for the same product
            // can pass individually yet exceed it together; this catches that.
            let updated =
                sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
                    .bind(qty)
                    .bind(product.id)
                    .bind(qty)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
            if updated == 0 {
                let available: i64 =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
                        .bind(product.id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(AppError::InsufficientStock {
                    product: product.name.clone(),
                    available,
                });
            }
        }

        append_history(&mut tx, order_id, OrderStatus::AwaitingPayment, Some("Pedido criado"))
            .await?;

        let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
        let items: Vec<OrderItem> = sqlx::query_as("SELECT * FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            user_id = user.id,
            total = %order.total,
            "Order created"
        );

        Ok(CreatedOrder { order, items })
    }

    /// Fetch one order with its items and full timeline.
    /// Customers see only their own orders; staff see any.
    pub async fn get_order(&self, user: &CurrentUser, order_id: i64) -> AppResult<OrderDetail> {
        let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(self.db().read())
            .await?;
        let order = order.ok_or_else(|| AppError::not_found("Pedido não encontrado"))?;

        if order.user_id != user.id && !user.role.is_staff() {
            return Err(AppError::AccessDenied);
        }

        let items: Vec<OrderItemDetail> = sqlx::query_as(
            "SELECT oi.product_id, p.name AS product_name, oi.qty, oi.unit_price
             FROM order_items oi
             JOIN products p ON p.id = oi.product_id
             WHERE oi.order_id = ?
             ORDER BY oi.id",
        )
        .bind(order_id)
        .fetch_all(self.db().read())
        .await?;

        let history: Vec<LogisticsEntry> = sqlx::query_as(
            "SELECT * FROM logistics_history WHERE order_id = ? ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(self.db().read())
        .await?;

        Ok(OrderDetail { order, items, history })
    }

    /// List orders, newest first. Customers are always scoped to their own
    /// orders; staff see everyone's and may filter by status.
    pub async fn list_orders(
        &self,
        user: &CurrentUser,
        filter: &OrderFilter,
        page: PageQuery,
    ) -> AppResult<Paginated<OrderSummary>> {
        let status = match &filter.status {
            Some(raw) => Some(
                OrderStatus::parse(raw).ok_or_else(|| AppError::InvalidStatus(raw.clone()))?,
            ),
            None => None,
        };

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT o.id, o.user_id, o.status, o.total, o.shipping_cost, o.created_at,
                    (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS item_count
             FROM orders o WHERE 1 = 1",
        );
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM orders o WHERE 1 = 1");

        if !user.role.is_staff() {
            for b in [&mut qb, &mut count_qb] {
                b.push(" AND o.user_id = ").push_bind(user.id);
            }
        }
        if let Some(status) = status {
            for b in [&mut qb, &mut count_qb] {
                b.push(" AND o.status = ").push_bind(status.as_str());
            }
        }

        qb.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items: Vec<OrderSummary> = qb
            .build_query_as()
            .fetch_all(self.db().read())
            .await?;
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.db().read())
            .await?;

        Ok(Paginated::new(items, page, total))
    }

    /// Advance an order along the forward path of the state machine.
    ///
    /// Cancellation is not accepted here: it restores stock and records a
    /// reason, which only the dedicated cancellation path does.
    pub async fn update_status(
        &self,
        user: &CurrentUser,
        order_id: i64,
        change: StatusChange,
    ) -> AppResult<Order> {
        user.require_staff()?;

        let next = OrderStatus::parse(&change.status)
            .ok_or_else(|| AppError::InvalidStatus(change.status.clone()))?;
        if next == OrderStatus::Cancelled {
            return Err(AppError::InvalidStatus(change.status));
        }

        let mut tx = self.db().write().begin().await?;

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        let current_raw = current.ok_or_else(|| AppError::not_found("Pedido não encontrado"))?;
        let current = OrderStatus::parse(&current_raw)
            .ok_or_else(|| AppError::database(format!("unknown order status '{current_raw}'")))?;

        if !current.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: current.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let financial = match next {
            OrderStatus::Paid => Some("Pago"),
            _ => None,
        };
        let updated = sqlx::query(
            "UPDATE orders
             SET status = ?,
                 financial_status = COALESCE(?, financial_status),
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND status = ?",
        )
        .bind(next.as_str())
        .bind(financial)
        .bind(order_id)
        .bind(current.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::Conflict(
                "Pedido foi alterado por outra operação".to_string(),
            ));
        }

        let note = change
            .note
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Status alterado por {}", user.name));
        append_history(&mut tx, order_id, next, Some(&note)).await?;

        let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            from = current.as_str(),
            to = next.as_str(),
            by = %user.name,
            "Order status updated"
        );

        Ok(order)
    }

    /// Cancel an order on the customer's (or an admin's) request.
    /// Only allowed before shipping; restores the stock of every line.
    pub async fn cancel_order(
        &self,
        user: &CurrentUser,
        order_id: i64,
        reason: &str,
    ) -> AppResult<Order> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("Motivo do cancelamento é obrigatório"));
        }

        let mut tx = self.db().write().begin().await?;

        let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        let order = order.ok_or_else(|| AppError::not_found("Pedido não encontrado"))?;

        if !order.status.is_cancellable() {
            return Err(AppError::CannotCancel(order.status.as_str().to_string()));
        }
        if !user.can_access_order(order.user_id) {
            return Err(AppError::AccessDenied);
        }

        let note = format!("Cancelado: {reason}");
        apply_cancellation(&mut tx, order_id, reason, &note).await?;

        let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id, user_id = user.id, reason, "Order cancelled");

        Ok(order)
    }
}

/// Flip an order to cancelled inside an open transaction: guarded status
/// update, cancellation record, stock restoration and a timeline entry.
/// Shared by customer cancellation and the expiry sweep.
pub(crate) async fn apply_cancellation(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: i64,
    reason: &str,
    note: &str,
) -> AppResult<()> {
    let updated = sqlx::query(
        "UPDATE orders
         SET status = 'Cancelado', financial_status = 'Cancelado', updated_at = CURRENT_TIMESTAMP
         WHERE id = ? AND status IN ('Aguardando Pagamento', 'Pago')",
    )
    .bind(order_id)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    if updated == 0 {
        let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?;
        return Err(match current {
            Some(status) => AppError::CannotCancel(status),
            None => AppError::not_found("Pedido não encontrado"),
        });
    }

    sqlx::query("INSERT INTO order_cancellations (order_id, reason) VALUES (?, ?)")
        .bind(order_id)
        .bind(reason)
        .execute(&mut **tx)
        .await?;

    // Restore every line. SUM covers orders carrying several lines for the
    // same product. Intentionally unaudited: stock_audit records
    // replenishments only, cancellations are reconstructable from the
    // cancellation record plus the order items.
    let restored = sqlx::query(
        "UPDATE products
         SET stock = stock + (SELECT COALESCE(SUM(oi.qty), 0) FROM order_items oi
                              WHERE oi.order_id = ? AND oi.product_id = products.id)
         WHERE id IN (SELECT product_id FROM order_items WHERE order_id = ?)",
    )
    .bind(order_id)
    .bind(order_id)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    tracing::debug!(order_id, products = restored, "Stock restored on cancellation");

    append_history(tx, order_id, OrderStatus::Cancelled, Some(note)).await?;

    Ok(())
}

/// Append a timeline row. The timeline is append-only; rows are never
/// updated or removed, not even when an order is cancelled.
pub(crate) async fn append_history(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: i64,
    status: OrderStatus,
    note: Option<&str>,
) -> AppResult<()> {
    sqlx::query("INSERT INTO logistics_history (order_id, status, note) VALUES (?, ?, ?)")
        .bind(order_id)
        .bind(status.as_str())
        .bind(note)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
