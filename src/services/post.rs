use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        post::*,
        response::PaginatedResult,
        user::Actor,
    },
    services::{
        database::ContentStore,
        media::MediaService,
        notification::NotificationService,
        workflow::{can_edit, can_view, PrivilegedFallback, QuickAction, TransitionExtra, TransitionOutcome, WorkflowEngine},
    },
    utils::{
        markdown,
        validation::{resolve_category, validate_required},
    },
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// 文章服务：读取 → 状态流转 → 保存 → 发通知
#[derive(Clone)]
pub struct PostService {
    content: Arc<dyn ContentStore>,
    notifications: NotificationService,
    media: MediaService,
    engine: WorkflowEngine,
    categories: Vec<String>,
    fallback_category: String,
    per_page: usize,
}

impl PostService {
    pub async fn new(
        content: Arc<dyn ContentStore>,
        notifications: NotificationService,
        media: MediaService,
        config: &Config,
    ) -> Result<Self> {
        let fallback = config
            .workflow_privileged_fallback
            .parse::<PrivilegedFallback>()
            .map_err(AppError::Internal)?;

        let mut categories = config.categories();
        if !categories.contains(&config.fallback_category) {
            categories.push(config.fallback_category.clone());
        }

        Ok(Self {
            content,
            notifications,
            media,
            engine: WorkflowEngine::new(fallback),
            categories,
            fallback_category: config.fallback_category.clone(),
            per_page: config.posts_per_page,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// 创建文章
    pub async fn create_post(&self, actor: &Actor, request: CreatePostRequest) -> Result<PostChange> {
        debug!("Creating post for user: {}", actor.id);

        request.validate()?;
        validate_required(&request.title, "Title")?;

        let content = markdown::normalize(&request.content);
        validate_required(&content, "Content")?;
        let category = resolve_category(
            request.category.as_deref(),
            &self.categories,
            &self.fallback_category,
        )?;

        let title = request.title.trim().to_string();
        let processed = self.media.process_images(request.images, &title).await?;

        let now = Utc::now();
        let mut post = Post {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            category,
            author_id: actor.id.clone(),
            cover_image_url: processed.cover_url,
            cover_image_alt: processed.cover_alt,
            images: processed.images,
            status: PostStatus::Draft,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };

        let outcome = self.engine.initial_transition(
            &mut post,
            actor,
            request.action.as_deref(),
            &TransitionExtra::default(),
        )?;

        self.persist(post, actor, outcome).await
    }

    /// 更新文章并执行表单上的动作
    pub async fn update_post(&self, post_id: &str, actor: &Actor, request: UpdatePostRequest) -> Result<PostChange> {
        debug!("Updating post: {} by user: {}", post_id, actor.id);

        request.validate()?;

        let mut post = self.load(post_id).await?;

        // 检查权限
        if !can_edit(&post, actor) {
            return Err(AppError::Authorization(
                "You are not allowed to edit this blog.".to_string(),
            ));
        }

        if let Some(title) = request.title {
            validate_required(&title, "Title")?;
            post.title = title.trim().to_string();
        }

        if let Some(content) = request.content {
            let content = markdown::normalize(&content);
            validate_required(&content, "Content")?;
            post.content = content;
        }

        if request.category.is_some() {
            post.category = resolve_category(
                request.category.as_deref(),
                &self.categories,
                &self.fallback_category,
            )?;
        }

        if let Some(images) = request.images {
            let processed = self.media.process_images(images, &post.title).await?;
            post.cover_image_url = processed.cover_url;
            post.cover_image_alt = processed.cover_alt;
            post.images = processed.images;
        }

        let extra = TransitionExtra {
            rejection_reason: request.rejection_reason,
        };
        let outcome = self
            .engine
            .submit_transition(&mut post, actor, request.action.as_deref(), &extra)?;

        self.persist(post, actor, outcome).await
    }

    /// 删除文章，关联通知一并删除
    pub async fn delete_post(&self, post_id: &str, actor: &Actor) -> Result<()> {
        let post = self.load(post_id).await?;

        if !can_edit(&post, actor) {
            return Err(AppError::Authorization(
                "You are not allowed to delete this blog.".to_string(),
            ));
        }

        self.content.delete(post_id).await?;
        let removed = self.notifications.delete_for_post(post_id).await?;

        info!(
            "Deleted post: {} by user: {} ({} notification(s) removed)",
            post_id, actor.id, removed
        );
        Ok(())
    }

    /// 读取文章；对当前用户不可见时按不存在处理
    pub async fn get_post(&self, post_id: &str, viewer: Option<&Actor>) -> Result<Post> {
        let post = self.load(post_id).await?;

        if !can_view(&post, viewer) {
            return Err(AppError::not_found("Post"));
        }

        Ok(post)
    }

    /// 文章列表：普通用户只能看到已发布的文章，状态筛选只对审核员生效
    pub async fn list_posts(&self, viewer: Option<&Actor>, query: &PostQuery) -> Result<PaginatedResult<Post>> {
        let privileged = viewer.map(|actor| actor.is_privileged).unwrap_or(false);

        let status = if privileged {
            match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                Some(status) => Some(status.parse::<PostStatus>().map_err(AppError::Validation)?),
                None => None,
            }
        } else {
            Some(PostStatus::Published)
        };

        let filter = PostFilter {
            status,
            author_id: None,
            query: query.q.clone(),
            category: query.category.clone().filter(|c| !c.trim().is_empty()),
        };

        let posts = self.content.list(&filter).await?;
        Ok(PaginatedResult::from_items(
            posts,
            query.page.unwrap_or(1),
            self.per_page,
        ))
    }

    /// 审核面板：待审核文章和各状态数量
    pub async fn review_panel(&self, actor: &Actor) -> Result<ReviewPanel> {
        if !actor.is_privileged {
            return Err(AppError::Authorization("Admin only.".to_string()));
        }

        let pending_posts = self
            .content
            .list(&PostFilter::with_status(PostStatus::Pending))
            .await?;

        let stats = StatusStats {
            draft: self.content.count_by_status(PostStatus::Draft).await?,
            pending: pending_posts.len(),
            published: self.content.count_by_status(PostStatus::Published).await?,
            rejected: self.content.count_by_status(PostStatus::Rejected).await?,
        };

        Ok(ReviewPanel {
            pending_posts,
            stats,
        })
    }

    pub async fn quick_approve(&self, post_id: &str, actor: &Actor) -> Result<PostChange> {
        self.quick(post_id, actor, QuickAction::Approve).await
    }

    pub async fn quick_reject(&self, post_id: &str, actor: &Actor, reason: &str) -> Result<PostChange> {
        self.quick(
            post_id,
            actor,
            QuickAction::Reject {
                reason: reason.to_string(),
            },
        )
        .await
    }

    pub async fn pending_count(&self) -> Result<usize> {
        self.content.count_by_status(PostStatus::Pending).await
    }

    async fn quick(&self, post_id: &str, actor: &Actor, action: QuickAction) -> Result<PostChange> {
        // 先检查权限，避免向普通用户暴露文章是否存在
        if !actor.is_privileged {
            return Err(AppError::Authorization("Admin only.".to_string()));
        }

        let mut post = self.load(post_id).await?;
        let outcome = self.engine.quick_transition(&mut post, actor, action)?;
        self.persist(post, actor, outcome).await
    }

    async fn load(&self, post_id: &str) -> Result<Post> {
        self.content
            .load(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))
    }

    async fn persist(&self, post: Post, actor: &Actor, outcome: TransitionOutcome) -> Result<PostChange> {
        self.content.save(&post).await?;

        let notifications = self
            .notifications
            .emit(&outcome.effects, &post, actor)
            .await?;

        info!(
            "Post {} moved {} -> {} by {} ({} notification(s))",
            post.id,
            outcome
                .previous
                .map(|status| status.as_str())
                .unwrap_or("new"),
            outcome.status,
            actor.id,
            notifications.len()
        );

        Ok(PostChange {
            post,
            previous_status: outcome.previous,
            notifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{auth::AuthService, database::Database};
    use tempfile::TempDir;

    struct Fixture {
        posts: PostService,
        db: Database,
        _media_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let media_dir = TempDir::new().unwrap();
        let config = Config {
            staff_users: "admin:Root".to_string(),
            media_root: media_dir.path().to_string_lossy().to_string(),
            ..Config::default()
        };

        let db = Database::new();
        let auth = AuthService::new(&config).await.unwrap();
        let media = MediaService::new(&config).await.unwrap();
        let notifications = NotificationService::new(Arc::new(db.clone()), Arc::new(auth), &config)
            .await
            .unwrap();
        let posts = PostService::new(Arc::new(db.clone()), notifications, media, &config)
            .await
            .unwrap();

        Fixture {
            posts,
            db,
            _media_dir: media_dir,
        }
    }

    fn request(action: Option<&str>) -> CreatePostRequest {
        CreatePostRequest {
            title: "My first post".to_string(),
            content: "# Hello\n**World**".to_string(),
            category: None,
            action: action.map(|a| a.to_string()),
            images: vec![],
        }
    }

    fn author() -> Actor {
        Actor::new("author", Some("alice".to_string()), false)
    }

    fn admin() -> Actor {
        Actor::new("admin", Some("Root".to_string()), true)
    }

    #[tokio::test]
    async fn test_create_normalizes_and_submits() {
        let f = fixture().await;

        let change = f.posts.create_post(&author(), request(None)).await.unwrap();

        assert_eq!(change.status(), PostStatus::Pending);
        assert_eq!(change.post.content, "Hello\nWorld");
        assert_eq!(change.post.category, "General");
        assert_eq!(change.notifications.len(), 1);
        assert_eq!(change.notifications[0].recipient_id, "admin");
        assert_eq!(f.db.post_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() {
        let f = fixture().await;
        let mut req = request(Some("draft"));
        req.category = Some("Cooking".to_string());

        let err = f.posts.create_post(&author(), req).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.db.post_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_content_is_rejected_before_normalizing() {
        let f = fixture().await;
        let mut req = request(Some("draft"));
        req.content = format!("{}x", "# ".repeat(60_000));

        let err = f.posts.create_post(&author(), req).await.unwrap_err();

        assert!(matches!(err, AppError::ValidatorError(_)));
        assert_eq!(f.db.post_count(), 0);
    }

    #[tokio::test]
    async fn test_update_by_stranger_is_forbidden() {
        let f = fixture().await;
        let change = f.posts.create_post(&author(), request(Some("draft"))).await.unwrap();
        let stranger = Actor::new("stranger", None, false);

        let err = f
            .posts
            .update_post(
                &change.post.id,
                &stranger,
                UpdatePostRequest {
                    title: Some("Hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(err.is_authorization());
        let stored = f.posts.get_post(&change.post.id, Some(&author())).await.unwrap();
        assert_eq!(stored.title, "My first post");
    }

    #[tokio::test]
    async fn test_list_hides_unpublished_from_authors() {
        let f = fixture().await;
        f.posts.create_post(&author(), request(Some("draft"))).await.unwrap();
        f.posts.create_post(&admin(), request(Some("publish"))).await.unwrap();

        let query = PostQuery {
            status: Some("draft".to_string()),
            ..Default::default()
        };

        let public = f.posts.list_posts(Some(&author()), &query).await.unwrap();
        assert_eq!(public.total, 1);
        assert!(public.data.iter().all(|p| p.is_published()));

        let staff = f.posts.list_posts(Some(&admin()), &query).await.unwrap();
        assert_eq!(staff.total, 1);
        assert_eq!(staff.data[0].status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_delete_cascades_notifications() {
        let f = fixture().await;
        let change = f.posts.create_post(&author(), request(Some("submit"))).await.unwrap();
        assert_eq!(f.db.notification_count(), 1);

        f.posts.delete_post(&change.post.id, &author()).await.unwrap();

        assert_eq!(f.db.post_count(), 0);
        assert_eq!(f.db.notification_count(), 0);
    }

    #[tokio::test]
    async fn test_review_panel_and_quick_actions() {
        let f = fixture().await;
        let change = f.posts.create_post(&author(), request(None)).await.unwrap();

        let err = f.posts.review_panel(&author()).await.unwrap_err();
        assert!(err.is_authorization());

        let panel = f.posts.review_panel(&admin()).await.unwrap();
        assert_eq!(panel.stats.pending, 1);
        assert_eq!(panel.pending_posts[0].id, change.post.id);

        let rejected = f
            .posts
            .quick_reject(&change.post.id, &admin(), "  needs sources ")
            .await
            .unwrap();
        assert_eq!(rejected.post.rejection_reason.as_deref(), Some("  needs sources "));
        assert_eq!(f.posts.pending_count().await.unwrap(), 0);

        let approved = f.posts.quick_approve(&change.post.id, &admin()).await.unwrap();
        assert_eq!(approved.status(), PostStatus::Published);
        assert_eq!(approved.notifications[0].recipient_id, "author");
    }

    #[tokio::test]
    async fn test_reject_reason_is_stored_as_supplied_on_both_paths() {
        let f = fixture().await;
        let reason = " cite your sources\n";

        let quick = f.posts.create_post(&author(), request(None)).await.unwrap();
        let quick = f
            .posts
            .quick_reject(&quick.post.id, &admin(), reason)
            .await
            .unwrap();

        let edited = f.posts.create_post(&author(), request(None)).await.unwrap();
        let edited = f
            .posts
            .update_post(
                &edited.post.id,
                &admin(),
                UpdatePostRequest {
                    action: Some("reject".to_string()),
                    rejection_reason: Some(reason.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(quick.post.rejection_reason.as_deref(), Some(reason));
        assert_eq!(edited.post.rejection_reason, quick.post.rejection_reason);
    }
}
