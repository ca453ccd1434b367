use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bazaar::{
    routes::build_router,
    test_utils::test_helpers::{self, SentKind},
};
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

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_register_verify_login_over_http() {
    let (state, email) = test_helpers::create_test_state().await.unwrap();
    let app = build_router(state);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/register/",
            Some(json!({
                "username": "alice",
                "email": "a@x.com",
                "password": "P@ss1",
                "confirm_password": "P@ss1"
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["user_id"].is_i64());

    // Inactive accounts cannot log in yet
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/login/",
            Some(json!({ "email": "a@x.com", "password": "P@ss1" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());

    let (status, _) = send(
        &app,
        request("GET", "/accounts/verify-email/wrong/", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let token = email.last_token(SentKind::Verification, "a@x.com").unwrap();
    let (status, body) = send(
        &app,
        request("GET", &format!("/accounts/verify-email/{}/", token), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email verified successfully");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/login/",
            Some(json!({ "email": "a@x.com", "password": "P@ss1" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body["access_token"].as_str().unwrap().starts_with("at_"));
    assert!(body["refresh_token"].as_str().unwrap().starts_with("rt_"));
}

#[tokio::test]
async fn test_register_validation_errors_are_keyed_by_field() {
    let (state, _email) = test_helpers::create_test_state().await.unwrap();
    let app = build_router(state);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/register/",
            Some(json!({
                "username": "alice",
                "email": "a@x.com",
                "password": "P@ss1",
                "confirm_password": "other"
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["password"], json!(["Passwords do not match"]));

    // Missing fields surface as field errors too
    let (status, body) = send(
        &app,
        request("POST", "/accounts/register/", Some(json!({})), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());
    assert!(body["username"].is_array());
}

#[tokio::test]
async fn test_logout_and_refresh_over_http() {
    let (state, _email) = test_helpers::create_test_state().await.unwrap();
    test_helpers::insert_test_user(&state.pool, "alice", "a@x.com", "secret", true, false)
        .await
        .unwrap();
    let app = build_router(state);

    let (_, login) = send(
        &app,
        request(
            "POST",
            "/accounts/login/",
            Some(json!({ "email": "a@x.com", "password": "secret" })),
            None,
        ),
    )
    .await;
    let access = login["access_token"].as_str().unwrap().to_string();
    let refresh = login["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/token/refresh/",
            Some(json!({ "refresh_token": refresh })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().unwrap().starts_with("at_"));
    assert!(body["expires_in"].as_i64().unwrap() > 0);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/accounts/logout/",
            Some(json!({ "refresh_token": refresh })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/logout/",
            Some(json!({ "refresh_token": refresh })),
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/accounts/logout/",
            Some(json!({ "refresh_token": refresh })),
            Some(&access),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/accounts/token/refresh/",
            Some(json!({ "refresh_token": refresh })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for body in [json!({ "refresh_token": "" }), json!({})] {
        let (status, body) = send(
            &app,
            request("POST", "/accounts/token/refresh/", Some(body), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["detail"].is_string());
    }
}

#[tokio::test]
async fn test_password_reset_over_http() {
    let (state, email) = test_helpers::create_test_state().await.unwrap();
    test_helpers::insert_test_user(&state.pool, "alice", "a@x.com", "secret", true, false)
        .await
        .unwrap();
    let app = build_router(state);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/password-reset/",
            Some(json!({ "email": "nobody@x.com" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/accounts/password-reset/",
            Some(json!({ "email": "a@x.com" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = email.last_token(SentKind::PasswordReset, "a@x.com").unwrap();

    let (status, body) = send(
        &app,
        request(
            "GET",
            &format!("/accounts/password-reset-confirm/{}/", token),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["token"], token.as_str());

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/accounts/password-reset-confirm/",
            Some(json!({
                "token": token,
                "new_password": "changed",
                "confirm_new_password": "different"
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["password"].is_array());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/accounts/password-reset-confirm/",
            Some(json!({
                "token": token,
                "new_password": "changed",
                "confirm_new_password": "changed"
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/accounts/password-reset-confirm/{}/", token),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/accounts/login/",
            Some(json!({ "email": "a@x.com", "password": "changed" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let (state, _email) = test_helpers::create_test_state().await.unwrap();
    let app = build_router(state);

    let response = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert!(headers.get("Strict-Transport-Security").is_none());
}
