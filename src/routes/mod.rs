pub mod ai;
pub mod notifications;
pub mod posts;
pub mod review;

use crate::{
    state::AppState,
    utils::middleware::{actor_middleware, ai_rate_limit_middleware},
};
use axum::{
    http::{HeaderValue, Method},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// 构建完整的应用路由，业务接口统一使用 /api/blog 前缀
pub fn app(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(
            app_state
                .config
                .cors_allowed_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        );

    let ai_routes = ai::router().route_layer(middleware::from_fn_with_state(
        app_state.clone(),
        ai_rate_limit_middleware,
    ));

    let media = ServeDir::new(&app_state.config.media_root);
    let media_url = app_state.config.media_mount();

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/blog/posts", posts::router())
        .nest("/api/blog/notifications", notifications::router())
        .nest("/api/blog/review", review::router())
        .nest("/api/blog/ai", ai_routes)
        .nest_service(&media_url, media)
        .layer(middleware::from_fn_with_state(app_state.clone(), actor_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
