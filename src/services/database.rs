use crate::error::Result;
use crate::models::{
    notification::Notification,
    post::{Post, PostFilter, PostStatus},
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// 文章存储
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<Post>>;

    /// 覆盖写入（后写者胜）
    async fn save(&self, post: &Post) -> Result<()>;

    /// 返回是否确实删除了记录
    async fn delete(&self, id: &str) -> Result<bool>;

    /// 按条件查询，按创建时间倒序
    async fn list(&self, filter: &PostFilter) -> Result<Vec<Post>>;

    async fn count_by_status(&self, status: PostStatus) -> Result<usize>;
}

/// 通知存储
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<()>;

    async fn create_many(&self, notifications: &[Notification]) -> Result<usize>;

    async fn get(&self, id: &str) -> Result<Option<Notification>>;

    async fn mark_read(&self, id: &str) -> Result<bool>;

    async fn mark_all_read(&self, recipient_id: &str) -> Result<usize>;

    async fn count_unread(&self, recipient_id: &str) -> Result<usize>;

    /// 按创建时间倒序
    async fn list_for(&self, recipient_id: &str, unread_only: bool, limit: usize) -> Result<Vec<Notification>>;

    async fn delete_for_post(&self, post_id: &str) -> Result<usize>;
}

/// 进程内存储，同时实现文章和通知两个存储接口
#[derive(Clone, Default)]
pub struct Database {
    posts: Arc<DashMap<String, Post>>,
    notifications: Arc<DashMap<String, Notification>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }
}

#[async_trait]
impl ContentStore for Database {
    async fn load(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.posts.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, post: &Post) -> Result<()> {
        debug!("Saving post {} ({})", post.id, post.status);
        self.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.posts.remove(id).is_some())
    }

    async fn list(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn count_by_status(&self, status: PostStatus) -> Result<usize> {
        Ok(self
            .posts
            .iter()
            .filter(|entry| entry.value().status == status)
            .count())
    }
}

#[async_trait]
impl NotificationStore for Database {
    async fn create(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn create_many(&self, notifications: &[Notification]) -> Result<usize> {
        for notification in notifications {
            self.notifications
                .insert(notification.id.clone(), notification.clone());
        }
        Ok(notifications.len())
    }

    async fn get(&self, id: &str) -> Result<Option<Notification>> {
        Ok(self.notifications.get(id).map(|entry| entry.value().clone()))
    }

    async fn mark_read(&self, id: &str) -> Result<bool> {
        match self.notifications.get_mut(id) {
            Some(mut entry) => {
                entry.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, recipient_id: &str) -> Result<usize> {
        let mut updated = 0;
        for mut entry in self.notifications.iter_mut() {
            if entry.recipient_id == recipient_id && !entry.is_read {
                entry.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count_unread(&self, recipient_id: &str) -> Result<usize> {
        Ok(self
            .notifications
            .iter()
            .filter(|entry| entry.recipient_id == recipient_id && !entry.is_read)
            .count())
    }

    async fn list_for(&self, recipient_id: &str, unread_only: bool, limit: usize) -> Result<Vec<Notification>> {
        let mut items: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|entry| entry.recipient_id == recipient_id)
            .filter(|entry| !unread_only || !entry.is_read)
            .map(|entry| entry.value().clone())
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit);
        Ok(items)
    }

    async fn delete_for_post(&self, post_id: &str) -> Result<usize> {
        let before = self.notifications.len();
        self.notifications
            .retain(|_, n| n.post_id.as_deref() != Some(post_id));
        Ok(before - self.notifications.len())
    }
}
