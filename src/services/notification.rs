use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        notification::{Notification, NotificationList},
        post::Post,
        user::Actor,
    },
    services::{auth::UserDirectory, database::NotificationStore, workflow::NotificationEffect},
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn UserDirectory>,
    limit: usize,
}

impl NotificationService {
    pub async fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn UserDirectory>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            store,
            directory,
            limit: config.notifications_limit,
        })
    }

    /// 把状态流转产生的通知效果落库，返回实际创建的通知
    pub async fn emit(
        &self,
        effects: &[NotificationEffect],
        post: &Post,
        actor: &Actor,
    ) -> Result<Vec<Notification>> {
        let mut created = Vec::new();

        for effect in effects {
            match effect {
                NotificationEffect::NotifyReviewers => {
                    let reviewers = self.directory.privileged_users().await?;
                    let batch: Vec<Notification> = reviewers
                        .iter()
                        .map(|reviewer| Notification::submitted(post, actor, &reviewer.id))
                        .collect();

                    if batch.is_empty() {
                        debug!("No reviewers to notify for post {}", post.id);
                        continue;
                    }

                    self.store.create_many(&batch).await?;
                    info!("Notified {} reviewer(s) about post {}", batch.len(), post.id);
                    created.extend(batch);
                }
                NotificationEffect::NotifyAuthorPublished => {
                    let notification = Notification::published(post, actor);
                    self.store.create(&notification).await?;
                    info!("Notified author {} that post {} is published", post.author_id, post.id);
                    created.push(notification);
                }
                NotificationEffect::NotifyAuthorRejected { reason } => {
                    let notification = Notification::rejected(post, actor, reason);
                    self.store.create(&notification).await?;
                    info!("Notified author {} that post {} was rejected", post.author_id, post.id);
                    created.push(notification);
                }
            }
        }

        Ok(created)
    }

    pub async fn list(&self, recipient_id: &str, unread_only: bool) -> Result<NotificationList> {
        let notifications = self
            .store
            .list_for(recipient_id, unread_only, self.limit)
            .await?;
        let unread_count = self.store.count_unread(recipient_id).await?;

        Ok(NotificationList {
            notifications,
            unread_count,
        })
    }

    /// 只有接收者本人可以标记已读；别人的通知按不存在处理
    pub async fn mark_read(&self, id: &str, recipient_id: &str) -> Result<Notification> {
        let mut notification = self
            .store
            .get(id)
            .await?
            .filter(|n| n.recipient_id == recipient_id)
            .ok_or_else(|| AppError::not_found("Notification"))?;

        if !notification.is_read {
            self.store.mark_read(id).await?;
            notification.is_read = true;
        }

        Ok(notification)
    }

    pub async fn mark_all_read(&self, recipient_id: &str) -> Result<usize> {
        let updated = self.store.mark_all_read(recipient_id).await?;
        debug!("Marked {} notification(s) read for {}", updated, recipient_id);
        Ok(updated)
    }

    pub async fn count_unread(&self, recipient_id: &str) -> Result<usize> {
        self.store.count_unread(recipient_id).await
    }

    pub async fn delete_for_post(&self, post_id: &str) -> Result<usize> {
        self.store.delete_for_post(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{notification::NotificationType, post::PostStatus};
    use crate::services::{auth::MockUserDirectory, database::Database};
    use chrono::Utc;

    fn post() -> Post {
        let now = Utc::now();
        Post {
            id: "post-1".to_string(),
            title: "Hello".to_string(),
            content: "World".to_string(),
            category: "General".to_string(),
            author_id: "author".to_string(),
            cover_image_url: None,
            cover_image_alt: None,
            images: vec![],
            status: PostStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn service(directory: MockUserDirectory, db: &Database) -> NotificationService {
        NotificationService::new(Arc::new(db.clone()), Arc::new(directory), &Config::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_submitted_fans_out_to_reviewers() {
        let mut directory = MockUserDirectory::new();
        directory.expect_privileged_users().times(1).returning(|| {
            Ok(vec![
                Actor::new("admin", None, true),
                Actor::new("editor", None, true),
            ])
        });
        let db = Database::new();
        let notifications = service(directory, &db).await;
        let author = Actor::new("author", Some("alice".to_string()), false);

        let created = notifications
            .emit(&[NotificationEffect::NotifyReviewers], &post(), &author)
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|n| n.notification_type == NotificationType::Submitted));
        assert_eq!(notifications.count_unread("editor").await.unwrap(), 1);
        assert_eq!(db.notification_count(), 2);
    }

    #[tokio::test]
    async fn test_author_effects_do_not_query_directory() {
        let mut directory = MockUserDirectory::new();
        directory.expect_privileged_users().never();
        let db = Database::new();
        let notifications = service(directory, &db).await;
        let admin = Actor::new("admin", None, true);

        let created = notifications
            .emit(
                &[NotificationEffect::NotifyAuthorRejected {
                    reason: "needs sources".to_string(),
                }],
                &post(),
                &admin,
            )
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].recipient_id, "author");
        assert_eq!(created[0].sender_id.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_mark_read_is_recipient_only() {
        let directory = MockUserDirectory::new();
        let db = Database::new();
        let notifications = service(directory, &db).await;
        let admin = Actor::new("admin", None, true);

        let created = notifications
            .emit(&[NotificationEffect::NotifyAuthorPublished], &post(), &admin)
            .await
            .unwrap();
        let id = &created[0].id;

        let err = notifications.mark_read(id, "someone-else").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(notifications.count_unread("author").await.unwrap(), 1);

        let read = notifications.mark_read(id, "author").await.unwrap();
        assert!(read.is_read);

        let list = notifications.list("author", false).await.unwrap();
        assert_eq!(list.notifications.len(), 1);
        assert_eq!(list.unread_count, 0);
        assert!(notifications.list("author", true).await.unwrap().notifications.is_empty());
    }
}
