use crate::{
    error::Result,
    models::{
        notification::{Notification, NotificationCount, NotificationList, NotificationQuery},
        response::ApiResponse,
    },
    state::AppState,
    utils::middleware::CurrentActor,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/count", get(notification_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

/// GET /api/blog/notifications?filter=unread
pub async fn list_notifications(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ApiResponse<NotificationList>>> {
    let list = app_state
        .notification_service
        .list(&actor.id, query.unread_only())
        .await?;

    Ok(Json(ApiResponse::success(list)))
}

/// POST /api/blog/notifications/:id/read
pub async fn mark_read(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Notification>>> {
    let notification = app_state.notification_service.mark_read(&id, &actor.id).await?;

    Ok(Json(ApiResponse::success(notification)))
}

/// POST /api/blog/notifications/read-all
pub async fn mark_all_read(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<ApiResponse<usize>>> {
    let updated = app_state.notification_service.mark_all_read(&actor.id).await?;

    Ok(Json(ApiResponse::success_with_message(
        updated,
        format!("{} notification(s) marked as read.", updated),
    )))
}

/// 未读数量；审核员额外返回待审核文章数
/// GET /api/blog/notifications/count
pub async fn notification_count(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<ApiResponse<NotificationCount>>> {
    let count = app_state.notification_service.count_unread(&actor.id).await?;
    let pending_count = if actor.is_privileged {
        Some(app_state.post_service.pending_count().await?)
    } else {
        None
    };

    Ok(Json(ApiResponse::success(NotificationCount {
        count,
        pending_count,
    })))
}
