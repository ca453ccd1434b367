use crate::auth::{
    handlers as account,
    middleware::{require_auth, require_staff},
};
use crate::handlers::{
    cart_handlers as carts, catalog_handlers as catalog, comment_handlers as comments,
};
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

fn account_routes(state: &AppState) -> Router<AppState> {
    let bearer = middleware::from_fn_with_state(state.clone(), require_auth);

    Router::new()
        .route("/register/", post(account::register_handler))
        .route("/verify-email/{token}/", get(account::verify_email_handler))
        .route("/login/", post(account::login_handler))
        .route(
            "/logout/",
            post(account::logout_handler).route_layer(bearer),
        )
        .route("/token/refresh/", post(account::refresh_handler))
        .route("/password-reset/", post(account::password_reset_handler))
        .route(
            "/password-reset-confirm/",
            post(account::password_reset_confirm_handler),
        )
        .route(
            "/password-reset-confirm/{token}/",
            get(account::password_reset_check_handler),
        )
}

/// Reads are public; writes on the same paths require a staff bearer token.
fn catalog_routes(state: &AppState) -> Router<AppState> {
    let staff = middleware::from_fn_with_state(state.clone(), require_staff);

    Router::new()
        .route(
            "/categories/",
            get(catalog::list_categories)
                .merge(post(catalog::create_category).route_layer(staff.clone())),
        )
        .route("/categories/active/", get(catalog::list_categories))
        .route(
            "/categories/{id}/",
            get(catalog::get_category).merge(
                put(catalog::update_category)
                    .delete(catalog::delete_category)
                    .route_layer(staff.clone()),
            ),
        )
        .route(
            "/brands/",
            get(catalog::list_brands).merge(post(catalog::create_brand).route_layer(staff.clone())),
        )
        .route(
            "/brands/{id}/",
            delete(catalog::delete_brand).route_layer(staff.clone()),
        )
        .route(
            "/products/",
            get(catalog::list_products)
                .merge(post(catalog::create_product).route_layer(staff.clone())),
        )
        .route("/products/popular/", get(catalog::popular_products))
        .route(
            "/products/{id}/",
            get(catalog::get_product).merge(
                put(catalog::update_product)
                    .delete(catalog::delete_product)
                    .route_layer(staff),
            ),
        )
        .route("/products/{id}/view/", get(catalog::view_product))
}

fn member_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/carts/", get(carts::list_carts).post(carts::create_cart))
        .route("/carts/{id}/", get(carts::get_cart).delete(carts::delete_cart))
        .route("/carts/{id}/add-item/", post(carts::add_item))
        .route("/carts/{id}/remove-item/", post(carts::remove_item))
        .route(
            "/carts/{id}/update-item-quantity/",
            post(carts::update_item_quantity),
        )
        .route(
            "/products/{id}/comments/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/products/{id}/comments/{comment_id}/",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/products/{id}/comments/{comment_id}/reply/",
            post(comments::reply_to_comment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origin = match state.settings.allowed_origins() {
        Some(origins) => AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        ),
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/accounts", account_routes(&state))
        .merge(catalog_routes(&state))
        .merge(member_routes(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            add_security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}

async fn add_security_headers(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let production = state.settings.is_production();
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if production {
        headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
        );
    }

    response
}
