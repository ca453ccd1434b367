use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bazaar::{routes::build_router, test_utils::test_helpers, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn request(method: &str, uri: &str, body: Option<Value>, token: &str) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(state: &AppState, email: &str) -> String {
    state
        .account_service
        .login(email, "secret")
        .await
        .unwrap()
        .tokens
        .access_token
}

/// Router, one product and tokens for two customers.
async fn setup() -> (Router, i64, String, String) {
    let (state, _email) = test_helpers::create_test_state().await.unwrap();
    test_helpers::insert_test_user(&state.pool, "alice", "a@x.com", "secret", true, false)
        .await
        .unwrap();
    test_helpers::insert_test_user(&state.pool, "bob", "b@x.com", "secret", true, false)
        .await
        .unwrap();
    let product = test_helpers::create_test_product(&state.pool, "Kettle", 3500, 4)
        .await
        .unwrap();

    let alice = login(&state, "a@x.com").await;
    let bob = login(&state, "b@x.com").await;
    (build_router(state), product, alice, bob)
}

#[tokio::test]
async fn test_comment_threads_nest_replies() {
    let (app, product, alice, bob) = setup().await;
    let base = format!("/products/{}/comments/", product);

    let (status, root) = send(
        &app,
        request("POST", &base, Some(json!({ "text": "Boils fast?" })), &alice),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["parent"], Value::Null);
    let root_id = root["id"].as_i64().unwrap();

    let (status, reply) = send(
        &app,
        request(
            "POST",
            &format!("{}{}/reply/", base, root_id),
            Some(json!({ "text": "Very fast" })),
            &bob,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["parent"], root_id);

    let (status, nested) = send(
        &app,
        request(
            "POST",
            &base,
            Some(json!({ "text": "Agreed", "parent": reply["id"] })),
            &alice,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    send(
        &app,
        request("POST", &base, Some(json!({ "text": "Second thread" })), &bob),
    )
    .await;

    let (status, threads) = send(&app, request("GET", &base, None, &alice)).await;
    assert_eq!(status, StatusCode::OK);
    let threads = threads.as_array().unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0]["id"], root_id);
    assert_eq!(threads[0]["replies"][0]["id"], reply["id"]);
    assert_eq!(threads[0]["replies"][0]["replies"][0]["id"], nested["id"]);
    assert!(threads[1]["replies"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_comment_validation() {
    let (app, product, alice, _bob) = setup().await;
    let base = format!("/products/{}/comments/", product);

    let (status, body) = send(
        &app,
        request("POST", &base, Some(json!({ "text": "   " })), &alice),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["text"].is_array());

    let (status, body) = send(&app, request("POST", &base, Some(json!({})), &alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["text"].is_array());

    let (status, body) = send(
        &app,
        request("POST", &base, Some(json!({ "text": "Hi", "parent": 4242 })), &alice),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["parent"].is_array());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/products/9999/comments/",
            Some(json!({ "text": "Hi" })),
            &alice,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_author_can_edit_or_delete() {
    let (app, product, alice, bob) = setup().await;
    let base = format!("/products/{}/comments/", product);

    let (_, comment) = send(
        &app,
        request("POST", &base, Some(json!({ "text": "Original" })), &alice),
    )
    .await;
    let uri = format!("{}{}/", base, comment["id"]);

    let (status, _) = send(
        &app,
        request("PUT", &uri, Some(json!({ "text": "Hijacked" })), &bob),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request("DELETE", &uri, None, &bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        request("PUT", &uri, Some(json!({ "text": "Edited" })), &alice),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "Edited");

    let (status, _) = send(&app, request("DELETE", &uri, None, &alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request("GET", &uri, None, &alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_a_comment_removes_its_replies() {
    let (app, product, alice, bob) = setup().await;
    let base = format!("/products/{}/comments/", product);

    let (_, root) = send(
        &app,
        request("POST", &base, Some(json!({ "text": "Root" })), &alice),
    )
    .await;
    let (_, reply) = send(
        &app,
        request(
            "POST",
            &format!("{}{}/reply/", base, root["id"]),
            Some(json!({ "text": "Reply" })),
            &bob,
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        request("DELETE", &format!("{}{}/", base, root["id"]), None, &alice),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("GET", &format!("{}{}/", base, reply["id"]), None, &bob),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
