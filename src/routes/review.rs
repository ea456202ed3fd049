use crate::{
    error::Result,
    models::{
        post::{PostChange, QuickRejectRequest, ReviewPanel},
        response::ApiResponse,
    },
    state::AppState,
    utils::middleware::CurrentActor,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(review_panel))
        .route("/:id/approve", post(quick_approve))
        .route("/:id/reject", post(quick_reject))
}

/// GET /api/blog/review
pub async fn review_panel(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<ApiResponse<ReviewPanel>>> {
    let panel = app_state.post_service.review_panel(&actor).await?;

    Ok(Json(ApiResponse::success(panel)))
}

/// POST /api/blog/review/:id/approve
pub async fn quick_approve(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PostChange>>> {
    let change = app_state.post_service.quick_approve(&id, &actor).await?;

    let message = format!("'{}' published!", change.post.title);
    Ok(Json(ApiResponse::success_with_message(change, message)))
}

/// 请求体可省略，省略时拒绝原因为空
/// POST /api/blog/review/:id/reject
pub async fn quick_reject(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Option<Json<QuickRejectRequest>>,
) -> Result<Json<ApiResponse<PostChange>>> {
    let reason = body.map(|Json(request)| request.reason).unwrap_or_default();
    let change = app_state.post_service.quick_reject(&id, &actor, &reason).await?;

    let message = format!("'{}' rejected.", change.post.title);
    Ok(Json(ApiResponse::success_with_message(change, message)))
}
