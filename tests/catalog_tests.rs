use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bazaar::{routes::build_router, test_utils::test_helpers, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn request(method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn view_from(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Forwarded-For", ip)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn access_token(state: &AppState, email: &str) -> String {
    state
        .account_service
        .login(email, "secret")
        .await
        .unwrap()
        .tokens
        .access_token
}

/// Router plus access tokens for a staff member and a regular customer.
async fn setup() -> (AppState, Router, String, String) {
    let (state, _email) = test_helpers::create_test_state().await.unwrap();
    test_helpers::insert_test_user(&state.pool, "admin", "admin@x.com", "secret", true, true)
        .await
        .unwrap();
    test_helpers::insert_test_user(&state.pool, "carl", "carl@x.com", "secret", true, false)
        .await
        .unwrap();

    let staff = access_token(&state, "admin@x.com").await;
    let customer = access_token(&state, "carl@x.com").await;
    let app = build_router(state.clone());
    (state, app, staff, customer)
}

#[tokio::test]
async fn test_catalog_writes_require_staff() {
    let (_state, app, staff, customer) = setup().await;
    let body = json!({ "title": "Gaming Laptops" });

    let (status, _) = send(&app, request("POST", "/categories/", Some(body.clone()), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request("POST", "/categories/", Some(body.clone()), Some(&customer)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, category) = send(
        &app,
        request("POST", "/categories/", Some(body), Some(&staff)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["slug"], "gaming-laptops");

    // Reads stay public
    let (status, list) = send(&app, request("GET", "/categories/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_slug_is_a_field_error() {
    let (_state, app, staff, _customer) = setup().await;

    let (status, _) = send(
        &app,
        request("POST", "/brands/", Some(json!({ "name": "Acme" })), Some(&staff)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        request("POST", "/brands/", Some(json!({ "name": "ACME" })), Some(&staff)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["name"].is_array());
}

#[tokio::test]
async fn test_product_validation_and_category_in_use() {
    let (state, app, staff, _customer) = setup().await;
    let category = test_helpers::create_test_category(&state.pool, "Phones").await.unwrap();
    let brand = test_helpers::create_test_brand(&state.pool, "Acme").await.unwrap();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/products/",
            Some(json!({
                "title": "Phone",
                "description": "A phone",
                "price": 0,
                "category": category,
                "brand": 9999
            })),
            Some(&staff),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["price"], json!(["Price must be positive"]));
    assert!(body["brand"].is_array());

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/products/",
            Some(json!({
                "title": "Phone",
                "description": "A phone",
                "price": 1_000_000_000_000_i64,
                "category": category,
                "brand": brand,
                "inventory": 100_000_000
            })),
            Some(&staff),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["price"].is_array());
    assert!(body["inventory"].is_array());

    let (status, body) = send(
        &app,
        request("POST", "/products/", Some(json!({})), Some(&staff)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["title"].is_array());
    for field in ["price", "category", "brand"] {
        assert_eq!(body[field], json!(["This field is required."]), "{}", field);
    }

    let (status, product) = send(
        &app,
        request(
            "POST",
            "/products/",
            Some(json!({
                "title": "Phone X",
                "description": "A phone",
                "price": 49900,
                "category": category,
                "brand": brand,
                "inventory": 3
            })),
            Some(&staff),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["slug"], "phone-x");
    assert_eq!(product["status"], "available");
    assert_eq!(product["category"], category);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/categories/{}/", category), None, Some(&staff)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            &format!("/products/{}/", product["id"]),
            None,
            Some(&staff),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/categories/{}/", category), None, Some(&staff)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unavailable_products_are_hidden() {
    let (state, app, staff, _customer) = setup().await;
    let product = test_helpers::create_test_product(&state.pool, "Lamp", 1500, 2)
        .await
        .unwrap();
    let category = test_helpers::create_test_category(&state.pool, "Lighting").await.unwrap();
    let brand = test_helpers::create_test_brand(&state.pool, "Lux").await.unwrap();

    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/products/{}/", product),
            Some(json!({
                "title": "Lamp",
                "description": "Out of stock",
                "price": 1500,
                "category": category,
                "brand": brand,
                "status": "unavailable"
            })),
            Some(&staff),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request("GET", &format!("/products/{}/", product), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, request("GET", "/products/", None, None)).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_views_count_once_per_ip_per_day() {
    let (state, app, _staff, _customer) = setup().await;
    let product = test_helpers::create_test_product(&state.pool, "Chair", 4200, 5)
        .await
        .unwrap();
    let uri = format!("/products/{}/view/", product);

    let (status, first) = send(&app, view_from(&uri, "203.0.113.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["is_new_view"], true);
    assert_eq!(first["product"]["views_count"], 1);
    assert_eq!(first["product"]["is_popular"], true);

    let (_, repeat) = send(&app, view_from(&uri, "203.0.113.1")).await;
    assert_eq!(repeat["is_new_view"], false);
    assert_eq!(repeat["product"]["views_count"], 1);

    let (_, other) = send(&app, view_from(&uri, "203.0.113.2, 10.0.0.1")).await;
    assert_eq!(other["is_new_view"], true);
    assert_eq!(other["product"]["views_count"], 2);

    let visits: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visited_products WHERE product_id = ?")
        .bind(product)
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(visits, 2);
}

#[tokio::test]
async fn test_view_records_authenticated_visitor() {
    let (state, app, _staff, customer) = setup().await;
    let product = test_helpers::create_test_product(&state.pool, "Desk", 9900, 1)
        .await
        .unwrap();

    let mut view = view_from(&format!("/products/{}/view/", product), "198.51.100.4");
    view.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", customer).parse().unwrap(),
    );
    let (status, _) = send(&app, view).await;
    assert_eq!(status, StatusCode::OK);

    let user_id: Option<i64> =
        sqlx::query_scalar("SELECT user_id FROM visited_products WHERE product_id = ?")
            .bind(product)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert!(user_id.is_some());

    let (status, _) = send(&app, view_from("/products/9999/view/", "198.51.100.4")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_popular_products_ordered_by_views() {
    let (state, app, _staff, _customer) = setup().await;
    let quiet = test_helpers::create_test_product(&state.pool, "Quiet", 100, 1)
        .await
        .unwrap();
    let busy = test_helpers::create_test_product(&state.pool, "Busy", 100, 1)
        .await
        .unwrap();
    test_helpers::create_test_product(&state.pool, "Unseen", 100, 1)
        .await
        .unwrap();

    send(&app, view_from(&format!("/products/{}/view/", quiet), "10.0.0.1")).await;
    for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        send(&app, view_from(&format!("/products/{}/view/", busy), ip)).await;
    }

    let (status, popular) = send(&app, request("GET", "/products/popular/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = popular
        .as_array()
        .unwrap()
        .iter()
        .map(|product| product["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![busy, quiet]);
}
