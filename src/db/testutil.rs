//! Shared fixtures for service-level tests

use rust_decimal::Decimal;

use super::DbService;
use crate::auth::CurrentUser;
use crate::db::models::Role;

pub async fn mem_db() -> DbService {
    DbService::open_in_memory()
        .await
        .unwrap_or_else(|e| panic!("in-memory database: {e}"))
}

pub async fn seed_user(db: &DbService, name: &str, email: &str, role: Role) -> i64 {
    sqlx::query("INSERT INTO users (name, email, password_hash, role) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind("$argon2id$test")
        .bind(role.as_str())
        .execute(db.write())
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn seed_address(db: &DbService, user_id: i64) -> i64 {
    sqlx::query(
        "INSERT INTO addresses (user_id, cep, street, number, type)
         VALUES (?, '01310-100', 'Av. Paulista', '1000', 'Residencial')",
    )
    .bind(user_id)
    .execute(db.write())
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn seed_product(
    db: &DbService,
    name: &str,
    price: Decimal,
    stock: i64,
    max_stock: Option<i64>,
) -> i64 {
    sqlx::query(
        "INSERT INTO products (name, category, price, stock, max_stock)
         VALUES (?, 'Eletrônicos', ?, ?, ?)",
    )
    .bind(name)
    .bind(price.to_string())
    .bind(stock)
    .bind(max_stock)
    .execute(db.write())
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn deactivate_product(db: &DbService, product_id: i64) {
    sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?")
        .bind(product_id)
        .execute(db.write())
        .await
        .unwrap();
}

pub async fn product_stock(db: &DbService, product_id: i64) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_one(db.read())
        .await
        .unwrap()
}

/// Rewrite an order's creation timestamp, for expiry-window tests
pub async fn backdate_order(db: &DbService, order_id: i64, timestamp: &str) {
    sqlx::query("UPDATE orders SET created_at = ? WHERE id = ?")
        .bind(timestamp)
        .bind(order_id)
        .execute(db.write())
        .await
        .unwrap();
}

pub fn current_user(id: i64, name: &str, role: Role) -> CurrentUser {
    CurrentUser {
        id,
        name: name.to_string(),
        role,
    }
}
