//! Order models and the order status state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::decimal_column;

/// Order status
///
/// The serialized Portuguese strings are the ones persisted into
/// `orders.status` and `logistics_history.status`; they round-trip unchanged.
///
/// Transition table (the single authority; nothing else compares statuses):
///
/// ```text
/// Aguardando Pagamento -> Pago | Cancelado
/// Pago                 -> Em Transporte | Cancelado
/// Em Transporte        -> Entregue
/// Entregue             -> (terminal)
/// Cancelado            -> (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Aguardando Pagamento")]
    AwaitingPayment,
    #[serde(rename = "Pago")]
    Paid,
    #[serde(rename = "Em Transporte")]
    InTransit,
    #[serde(rename = "Entregue")]
    Delivered,
    #[serde(rename = "Cancelado")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "Aguardando Pagamento",
            OrderStatus::Paid => "Pago",
            OrderStatus::InTransit => "Em Transporte",
            OrderStatus::Delivered => "Entregue",
            OrderStatus::Cancelled => "Cancelado",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Aguardando Pagamento" => Some(OrderStatus::AwaitingPayment),
            "Pago" => Some(OrderStatus::Paid),
            "Em Transporte" => Some(OrderStatus::InTransit),
            "Entregue" => Some(OrderStatus::Delivered),
            "Cancelado" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether `next` is a legal transition from this status
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (AwaitingPayment, Paid)
                | (AwaitingPayment, Cancelled)
                | (Paid, InTransit)
                | (Paid, Cancelled)
                | (InTransit, Delivered)
        )
    }

    /// Cancellation is only allowed before shipping
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::AwaitingPayment | OrderStatus::Paid)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub address_id: i64,
    pub payment_method: String,
    pub total: Decimal,
    pub shipping_cost: Decimal,
    pub status: OrderStatus,
    pub financial_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status_raw: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "status".into(),
            source: format!("unknown order status '{status_raw}'").into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            address_id: row.try_get("address_id")?,
            payment_method: row.try_get("payment_method")?,
            total: decimal_column(row, "total")?,
            shipping_cost: decimal_column(row, "shipping_cost")?,
            status,
            financial_status: row.try_get("financial_status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Order line, capturing quantity and unit price at time of purchase.
/// The price is copied, never re-read: historical orders keep their value
/// when catalog prices change.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub qty: i64,
    pub unit_price: Decimal,
}

impl sqlx::FromRow<'_, SqliteRow> for OrderItem {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            qty: row.try_get("qty")?,
            unit_price: decimal_column(row, "unit_price")?,
        })
    }
}

/// Append-only per-order timeline entry; one row per status transition,
/// including creation and cancellation. Never updated or deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LogisticsEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Return request type, controlling the return window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Defect,
    NoDefect,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Defect => "defect",
            ReturnType::NoDefect => "no_defect",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "defect" => Some(ReturnType::Defect),
            "no_defect" => Some(ReturnType::NoDefect),
            _ => None,
        }
    }

    /// Days after delivery within which the return may be requested
    pub fn window_days(&self) -> i64 {
        match self {
            ReturnType::Defect => 30,
            ReturnType::NoDefect => 7,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReturnType::Defect => "produtos com defeito",
            ReturnType::NoDefect => "produtos sem defeito",
        }
    }
}

/// Return request; at most one per order
#[derive(Debug, Clone, Serialize)]
pub struct OrderReturn {
    pub id: i64,
    pub order_id: i64,
    /// Requested items, stored as the JSON the caller sent
    pub items: serde_json::Value,
    pub reason: String,
    pub return_type: ReturnType,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, SqliteRow> for OrderReturn {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let type_raw: String = row.try_get("return_type")?;
        let return_type =
            ReturnType::parse(&type_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "return_type".into(),
                source: format!("unknown return type '{type_raw}'").into(),
            })?;

        let items_raw: String = row.try_get("items")?;
        let items = serde_json::from_str(&items_raw).map_err(|e| sqlx::Error::ColumnDecode {
            index: "items".into(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            items,
            reason: row.try_get("reason")?,
            return_type,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use OrderStatus::*;
        assert!(AwaitingPayment.can_transition_to(Paid));
        assert!(AwaitingPayment.can_transition_to(Cancelled));
        assert!(Paid.can_transition_to(InTransit));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(InTransit.can_transition_to(Delivered));
    }

    #[test]
    fn test_rejected_transitions() {
        use OrderStatus::*;
        // Skipping ahead
        assert!(!AwaitingPayment.can_transition_to(InTransit));
        assert!(!AwaitingPayment.can_transition_to(Delivered));
        assert!(!Paid.can_transition_to(Delivered));
        // Going backwards
        assert!(!Paid.can_transition_to(AwaitingPayment));
        assert!(!InTransit.can_transition_to(Paid));
        assert!(!InTransit.can_transition_to(Cancelled));
        // Terminal statuses have no outgoing edges
        for next in [AwaitingPayment, Paid, InTransit, Delivered, Cancelled] {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_self_transitions_rejected() {
        use OrderStatus::*;
        for status in [AwaitingPayment, Paid, InTransit, Delivered, Cancelled] {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_status_strings_round_trip() {
        use OrderStatus::*;
        for status in [AwaitingPayment, Paid, InTransit, Delivered, Cancelled] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("Aguardando Pagamento"), Some(AwaitingPayment));
        assert_eq!(OrderStatus::parse("Entregue"), Some(Delivered));
        assert_eq!(OrderStatus::parse("entregue"), None);
        assert_eq!(OrderStatus::parse("Unknown"), None);
    }

    #[test]
    fn test_cancellable_set() {
        use OrderStatus::*;
        assert!(AwaitingPayment.is_cancellable());
        assert!(Paid.is_cancellable());
        assert!(!InTransit.is_cancellable());
        assert!(!Delivered.is_cancellable());
        assert!(!Cancelled.is_cancellable());
    }

    #[test]
    fn test_return_windows() {
        assert_eq!(ReturnType::Defect.window_days(), 30);
        assert_eq!(ReturnType::NoDefect.window_days(), 7);
        assert_eq!(ReturnType::parse("defect"), Some(ReturnType::Defect));
        assert_eq!(ReturnType::parse("no_defect"), Some(ReturnType::NoDefect));
        assert_eq!(ReturnType::parse("refund"), None);
    }
}
