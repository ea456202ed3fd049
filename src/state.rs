use crate::{
    config::Config,
    error::{AppError, Result},
    services::{
        AuthService, Database, GenerationService, MediaService, NotificationService, PostService,
    },
};
use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc};

pub type KeyedRateLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// 应用程序的共享状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 进程内存储
    pub db: Database,

    /// 用户目录
    pub auth_service: AuthService,

    /// 文章与审核流程
    pub post_service: PostService,

    pub notification_service: NotificationService,

    /// AI 生成
    pub generation_service: GenerationService,

    pub media_service: MediaService,

    /// AI 接口按用户限流
    pub ai_rate_limiter: Arc<KeyedRateLimiter>,
}

impl AppState {
    /// 按配置组装所有服务
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new();
        let auth_service = AuthService::new(&config).await?;
        let media_service = MediaService::new(&config).await?;

        let notification_service = NotificationService::new(
            Arc::new(db.clone()),
            Arc::new(auth_service.clone()),
            &config,
        )
        .await?;

        let post_service = PostService::new(
            Arc::new(db.clone()),
            notification_service.clone(),
            media_service.clone(),
            &config,
        )
        .await?;

        let generation_service = GenerationService::new(&config, media_service.clone()).await?;

        let per_minute = NonZeroU32::new(config.rate_limit_requests)
            .ok_or_else(|| AppError::Internal("RATE_LIMIT_REQUESTS must be positive".to_string()))?;
        let ai_rate_limiter = Arc::new(RateLimiter::dashmap(Quota::per_minute(per_minute)));

        Ok(Self {
            config,
            db,
            auth_service,
            post_service,
            notification_service,
            generation_service,
            media_service,
            ai_rate_limiter,
        })
    }

    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.config.is_development()
    }
}
