// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, health, home, notification, post as posts, profile},
    state::AppState,
    utils::{
        jwt::{admin_middleware, auth_middleware},
        rate_limit::rate_limit_middleware,
    },
};

/// Assembles the main application router.
///
/// * Health sits outside the rate limit so uptime checks never see 429.
/// * Every other `/api` route is rate limited per client.
/// * Notification and post routes additionally require a bearer token.
/// * Admin routes require an admin token and are never cached.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let user_routes = Router::new()
        .route(
            "/notifications",
            get(notification::list_notifications).delete(notification::clear_notifications),
        )
        .route("/posts/{id}/restore", post(posts::restore_own_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/me", get(admin::me))
        .route("/stats", get(admin::stats))
        .route("/posts/delete", post(admin::delete_post))
        .route("/posts/restore", post(admin::restore_post))
        .route("/posts/purge", post(admin::purge_post))
        .route("/posts/history", get(admin::deletion_history))
        .route("/users/ban", post(admin::ban_user))
        .route("/users/status", get(admin::user_status))
        // Auth first, then the admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ));

    let api_routes = Router::new()
        .route("/home", get(home::get_home))
        .route("/profiles/{username}/preview", get(profile::get_preview))
        .merge(user_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
