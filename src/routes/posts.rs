use crate::{
    error::Result,
    models::post::*,
    state::AppState,
    utils::middleware::{CurrentActor, OptionalActor},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_posts))
        .route("/create", post(create_post))
        .route("/:id", get(get_post).put(update_post).delete(delete_post))
}

/// 获取文章列表
/// GET /api/blog/posts
pub async fn list_posts(
    State(app_state): State<Arc<AppState>>,
    OptionalActor(viewer): OptionalActor,
    Query(query): Query<PostQuery>,
) -> Result<Json<Value>> {
    debug!("Fetching posts list with query: {:?}", query);

    let result = app_state
        .post_service
        .list_posts(viewer.as_ref(), &query)
        .await?;

    // 审核员的待审核角标
    let pending_count = match &viewer {
        Some(actor) if actor.is_privileged => app_state.post_service.pending_count().await?,
        _ => 0,
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "posts": result.data,
            "pagination": {
                "current_page": result.page,
                "total_pages": result.total_pages,
                "total_items": result.total,
                "items_per_page": result.per_page,
                "has_next": result.page < result.total_pages,
                "has_prev": result.page > 1,
            },
            "pending_count": pending_count,
            "categories": app_state.post_service.categories(),
        }
    })))
}

/// 获取文章详情
/// GET /api/blog/posts/:id
pub async fn get_post(
    State(app_state): State<Arc<AppState>>,
    OptionalActor(viewer): OptionalActor,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let post = app_state.post_service.get_post(&id, viewer.as_ref()).await?;
    let cover_image = post.cover_image().map(|url| url.to_string());

    Ok(Json(json!({
        "success": true,
        "data": {
            "post": post,
            "cover_image": cover_image,
        }
    })))
}

/// 创建文章
/// POST /api/blog/posts/create
pub async fn create_post(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let change = app_state.post_service.create_post(&actor, request).await?;
    info!("Created post: {} by user: {}", change.post.id, actor.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": change,
            "message": change.summary(),
        })),
    ))
}

/// 更新文章
/// PUT /api/blog/posts/:id
pub async fn update_post(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Value>> {
    let change = app_state.post_service.update_post(&id, &actor, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": change,
        "message": change.summary(),
    })))
}

/// 删除文章
/// DELETE /api/blog/posts/:id
pub async fn delete_post(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    app_state.post_service.delete_post(&id, &actor).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Blog deleted successfully."
    })))
}
