use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::post::Post;
use super::user::Actor;
use crate::utils::validation::truncate_chars;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub sender_id: Option<String>,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    /// 关联文章，仅用于查找
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Submitted,
    Published,
    Rejected,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub filter: Option<String>,
}

impl NotificationQuery {
    pub fn unread_only(&self) -> bool {
        self.filter.as_deref() == Some("unread")
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
pub struct NotificationCount {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_count: Option<usize>,
}

impl Notification {
    fn new(
        recipient_id: &str,
        sender_id: Option<&str>,
        notification_type: NotificationType,
        title: String,
        message: String,
        post: &Post,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_id: recipient_id.to_string(),
            sender_id: sender_id.map(|s| s.to_string()),
            notification_type,
            title,
            message,
            post_id: Some(post.id.clone()),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    /// 作者提交审核，通知某位审核员
    pub fn submitted(post: &Post, author: &Actor, reviewer_id: &str) -> Self {
        Self::new(
            reviewer_id,
            Some(&author.id),
            NotificationType::Submitted,
            format!("New Blog: {}", truncate_chars(&post.title, 50)),
            format!("{} submitted \"{}\" for review.", author.display_name(), post.title),
            post,
        )
    }

    pub fn published(post: &Post, reviewer: &Actor) -> Self {
        Self::new(
            &post.author_id,
            Some(&reviewer.id),
            NotificationType::Published,
            "Your Blog is Published!".to_string(),
            format!("Your blog \"{}\" has been published.", post.title),
            post,
        )
    }

    pub fn rejected(post: &Post, reviewer: &Actor, reason: &str) -> Self {
        let mut message = format!("Your blog \"{}\" was rejected.", post.title);
        if !reason.is_empty() {
            message.push_str(&format!(" Reason: {}", reason));
        }

        Self::new(
            &post.author_id,
            Some(&reviewer.id),
            NotificationType::Rejected,
            "Blog Rejected".to_string(),
            message,
            post,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::PostStatus;

    fn sample_post(title: &str) -> Post {
        let now = Utc::now();
        Post {
            id: "post-1".to_string(),
            title: title.to_string(),
            content: String::new(),
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

    #[test]
    fn test_submitted_title_is_truncated() {
        let post = sample_post(&"é".repeat(80));
        let author = Actor::new("author", Some("alice".to_string()), false);

        let n = Notification::submitted(&post, &author, "admin");

        assert_eq!(n.title.chars().count(), "New Blog: ".len() + 50);
        assert_eq!(n.recipient_id, "admin");
        assert_eq!(n.sender_id.as_deref(), Some("author"));
        assert!(n.message.starts_with("alice submitted"));
    }

    #[test]
    fn test_rejected_message_includes_reason_only_when_present() {
        let post = sample_post("Draft");
        let admin = Actor::new("admin", None, true);

        assert_eq!(
            Notification::rejected(&post, &admin, "").message,
            "Your blog \"Draft\" was rejected."
        );
        assert!(Notification::rejected(&post, &admin, "too short")
            .message
            .ends_with("Reason: too short"));
    }
}
