//! End-to-end API tests over an in-memory database
//!
//! Each test builds the full router (routes, auth middleware, layers) and
//! drives it with oneshot requests, the same way real clients would.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use commerce_server::auth::JwtConfig;
use commerce_server::core::{Config, ServerState};
use commerce_server::{DbService, JwtService, api};

async fn test_app() -> (Router, ServerState) {
    let db = DbService::open_in_memory().await.unwrap();
    let mut config = Config::from_env();
    config.jwt = JwtConfig {
        secret: "integration-test-secret-0123456789abcdef".into(),
        expiration_minutes: 30,
        issuer: "commerce-server".into(),
        audience: "commerce-clients".into(),
    };
    let state = ServerState {
        config: config.clone(),
        db,
        jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
    };
    (api::build_app(state.clone()), state)
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register an account through the API and return its token
async fn register(app: &Router, name: &str, email: &str, role: Option<&str>) -> String {
    let mut payload = json!({
        "name": name,
        "email": email,
        "password": "senha-secreta",
    });
    if let Some(role) = role {
        payload["role"] = json!(role);
    }
    let (status, body) = request(app, "POST", "/api/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_address(app: &Router, token: &str) -> i64 {
    let (status, body) = request(
        app,
        "POST",
        "/api/users/addresses",
        Some(token),
        Some(json!({
            "cep": "01310-100",
            "street": "Av. Paulista",
            "number": "1000",
            "type": "Residencial",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create address failed: {body}");
    body["data"]["id"].as_i64().unwrap()
}

async fn seed_product(state: &ServerState, name: &str, price: &str, stock: i64) -> i64 {
    sqlx::query("INSERT INTO products (name, category, price, stock) VALUES (?, 'Eletrônicos', ?, ?)")
        .bind(name)
        .bind(price)
        .bind(stock)
        .execute(state.db.write())
        .await
        .unwrap()
        .last_insert_rowid()
}

#[tokio::test]
async fn test_public_and_protected_routes() {
    let (app, state) = test_app().await;
    seed_product(&state, "Fone Bluetooth", "120.00", 5).await;

    let (status, body) = request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    // The catalog is public
    let (status, body) = request(&app, "GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let (status, body) = request(
        &app,
        "GET",
        "/api/logistics/quote?subtotal=250.00",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["shipping_cost"], "100.00");
    assert_eq!(body["data"]["total"], "350.00");

    // Orders are not
    let (status, body) = request(&app, "GET", "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "NO_TOKEN");

    let (status, body) = request(&app, "GET", "/api/orders", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_full_order_lifecycle() {
    let (app, state) = test_app().await;
    let product_id = seed_product(&state, "Notebook", "450.00", 10).await;

    let customer = register(&app, "Maria", "maria@example.com", None).await;
    let staff = register(&app, "Carlos", "carlos@example.com", Some("Vendedor")).await;
    let admin = register(&app, "Ana", "ana@example.com", Some("Admin")).await;
    let address_id = create_address(&app, &customer).await;

    // Create: 450.00 clears the free-shipping threshold
    let (status, body) = request(
        &app,
        "POST",
        "/api/orders",
        Some(&customer),
        Some(json!({
            "address_id": address_id,
            "payment_method": "pix",
            "items": [{ "product_id": product_id, "qty": 1 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create order failed: {body}");
    let order_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["status"], "Aguardando Pagamento");
    assert_eq!(body["data"]["shipping_cost"], "0");
    assert_eq!(body["data"]["total"], "450.00");

    // A customer cannot advance the status
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/orders/{order_id}/status"),
        Some(&customer),
        Some(json!({ "status": "Pago" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCESS_DENIED");

    // Staff walks the forward path
    for next in ["Pago", "Em Transporte", "Entregue"] {
        let (status, body) = request(
            &app,
            "PATCH",
            &format!("/api/orders/{order_id}/status"),
            Some(&staff),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "transition to {next} failed: {body}");
        assert_eq!(body["data"]["status"], next);
    }

    // Skipping ahead is rejected with both statuses named
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/orders/{order_id}/status"),
        Some(&staff),
        Some(json!({ "status": "Pago" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    // The timeline recorded every step
    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/logistics/{order_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec!["Aguardando Pagamento", "Pago", "Em Transporte", "Entregue"]
    );

    // Delivered order takes a return request
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/return"),
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "qty": 1 }],
            "reason": "Tela com defeito",
            "return_type": "defect",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "return failed: {body}");
    assert_eq!(body["data"]["status"], "Pending");

    // Only once per order
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/return"),
        Some(&customer),
        Some(json!({
            "items": [{ "product_id": product_id, "qty": 1 }],
            "reason": "Outro motivo",
            "return_type": "no_defect",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "RETURN_ALREADY_EXISTS");

    // Admin sees the request in the listing; staff does not
    let (status, body) = request(&app, "GET", "/api/orders/returns", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["customer_name"], "Maria");

    let (status, _) = request(&app, "GET", "/api/orders/returns", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancellation_restores_stock() {
    let (app, state) = test_app().await;
    let product_id = seed_product(&state, "Teclado", "150.00", 3).await;

    let customer = register(&app, "Maria", "maria@example.com", None).await;
    let address_id = create_address(&app, &customer).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/orders",
        Some(&customer),
        Some(json!({
            "address_id": address_id,
            "payment_method": "boleto",
            "items": [{ "product_id": product_id, "qty": 2 }],
        })),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/products/{product_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 1);

    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/cancel"),
        Some(&customer),
        Some(json!({ "reason": "Comprei errado" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "cancel failed: {body}");
    assert_eq!(body["data"]["status"], "Cancelado");

    let (_, body) = request(
        &app,
        "GET",
        &format!("/api/products/{product_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(body["data"]["stock"], 3);

    // Cancelling again fails
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/cancel"),
        Some(&customer),
        Some(json!({ "reason": "De novo" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CANNOT_CANCEL");
}

#[tokio::test]
async fn test_stock_endpoints_and_roles() {
    let (app, state) = test_app().await;
    let product_id = seed_product(&state, "Monitor", "900.00", 20).await;

    let customer = register(&app, "Maria", "maria@example.com", None).await;
    let staff = register(&app, "Carlos", "carlos@example.com", Some("Vendedor")).await;
    let admin = register(&app, "Ana", "ana@example.com", Some("Admin")).await;

    let uri = format!("/api/products/{product_id}/stock");
    let (status, body) =
        request(&app, "POST", &uri, Some(&customer), Some(json!({ "amount": 10 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) =
        request(&app, "POST", &uri, Some(&staff), Some(json!({ "amount": 7 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STOCK");

    let (status, body) =
        request(&app, "POST", &uri, Some(&staff), Some(json!({ "amount": 30 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 50);

    let audit_uri = format!("/api/products/{product_id}/stock-audit");
    let (status, _) = request(&app, "GET", &audit_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(&app, "GET", &audit_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["added_amount"], 30);
}

#[tokio::test]
async fn test_expiry_job_endpoint() {
    let (app, state) = test_app().await;
    let product_id = seed_product(&state, "Cadeira", "380.00", 5).await;

    let customer = register(&app, "Maria", "maria@example.com", None).await;
    let admin = register(&app, "Ana", "ana@example.com", Some("Admin")).await;
    let address_id = create_address(&app, &customer).await;

    let (_, body) = request(
        &app,
        "POST",
        "/api/orders",
        Some(&customer),
        Some(json!({
            "address_id": address_id,
            "payment_method": "boleto",
            "items": [{ "product_id": product_id, "qty": 1 }],
        })),
    )
    .await;
    let order_id = body["data"]["id"].as_i64().unwrap();

    // Age the order past the grace period
    sqlx::query("UPDATE orders SET created_at = '2024-01-01 08:00:00' WHERE id = ?")
        .bind(order_id)
        .execute(state.db.write())
        .await
        .unwrap();

    let (status, _) = request(
        &app,
        "POST",
        "/api/jobs/pending-cancellations",
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(
        &app,
        "POST",
        "/api/jobs/pending-cancellations",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cancelled_count"], 1);
    assert_eq!(body["data"]["cancelled_orders"][0], order_id);

    let (_, body) = request(
        &app,
        "GET",
        &format!("/api/orders/{order_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(body["data"]["status"], "Cancelado");
    let last = body["data"]["history"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(
        last["note"],
        "Cancelado automaticamente: Pagamento não confirmado em 72h"
    );
}
