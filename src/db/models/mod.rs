//! Database Models
//!
//! Row types and the enums persisted with them. Status and role strings are
//! part of the persisted contract and must round-trip unchanged.

pub mod order;
pub mod product;
pub mod stock_audit;
pub mod user;

pub use order::{LogisticsEntry, Order, OrderItem, OrderReturn, OrderStatus, ReturnType};
pub use product::Product;
pub use stock_audit::StockAuditRecord;
pub use user::{Address, Role, User};

use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;

/// Decode a money column stored as TEXT into a `Decimal`
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Timestamp format SQLite uses for `CURRENT_TIMESTAMP`
///
/// Timestamps written from Rust use the same format so that string
/// comparisons and `datetime()` normalization behave uniformly.
pub const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC timestamp the way SQLite's `CURRENT_TIMESTAMP` does
pub fn sqlite_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format(SQLITE_DATETIME_FORMAT).to_string()
}
