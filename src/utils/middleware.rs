use crate::{error::AppError, models::user::Actor, state::AppState};
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, warn};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// 身份中间件
///
/// 登录由上游网关完成，网关在请求头中带上用户ID和用户名。这里只负责把身份
/// 解析成 `Actor` 放进请求扩展；权限始终以用户目录为准。
pub async fn actor_middleware(
    State(app_state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Response {
    if let Some(user_id) = header_value(request.headers(), USER_ID_HEADER) {
        let username = header_value(request.headers(), USER_NAME_HEADER);
        let actor = app_state.auth_service.resolve_actor(&user_id, username);

        debug!(
            "Request from {} (privileged: {})",
            actor.id, actor.is_privileged
        );
        request.extensions_mut().insert(actor);
    }

    next.run(request).await
}

/// AI 接口限流：已登录用户按用户ID，否则按客户端 IP
pub async fn ai_rate_limit_middleware(
    State(app_state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let key = match request.extensions().get::<Actor>() {
        Some(actor) => format!("user:{}", actor.id),
        None => format!("ip:{}", get_client_ip(&request)),
    };

    match app_state.ai_rate_limiter.check_key(&key) {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            warn!("Rate limit exceeded for {}", key);
            Err(AppError::RateLimitExceeded)
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

/// 获取客户端 IP 地址
fn get_client_ip(request: &Request<Body>) -> String {
    let headers = request.headers();

    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(ip_str) = forwarded_for.to_str() {
            if let Some(ip) = ip_str.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return ip_str.to_string();
        }
    }

    request
        .extensions()
        .get::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 必须带有身份的请求
pub struct CurrentActor(pub Actor);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentActor)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// 匿名访问也允许的请求
pub struct OptionalActor(pub Option<Actor>);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for OptionalActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalActor(parts.extensions.get::<Actor>().cloned()))
    }
}
