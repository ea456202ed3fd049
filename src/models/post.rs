use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::notification::Notification;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_id: String,
    pub cover_image_url: Option<String>,
    pub cover_image_alt: Option<String>,
    #[serde(default)]
    pub images: Vec<PostImage>,
    pub status: PostStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Pending,
    Published,
    Rejected,
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl PostStatus {
    pub const ALL: [PostStatus; 4] = [
        PostStatus::Draft,
        PostStatus::Pending,
        PostStatus::Published,
        PostStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }

    pub fn can_be_viewed_by_public(&self) -> bool {
        matches!(self, Self::Published)
    }

    /// 审核结论状态，必须带有 approved_by / approved_at
    pub fn is_reviewed(&self) -> bool {
        matches!(self, Self::Published | Self::Rejected)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Unknown post status: {}", other)),
        }
    }
}

/// 文章中的图片（手动上传或 AI 生成）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostImage {
    pub src: String,
    #[serde(rename = "type", default = "default_image_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isCover", default)]
    pub is_cover: bool,
}

fn default_image_kind() -> String {
    "manual".to_string()
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }

    /// 封面图：优先 cover_image_url，其次标记为封面的图片，最后第一张图片。
    /// data: URL 永远不作为封面返回。
    pub fn cover_image(&self) -> Option<&str> {
        if let Some(url) = self.cover_image_url.as_deref() {
            if !url.is_empty() && !url.starts_with("data:") {
                return Some(url);
            }
        }

        let usable = |img: &&PostImage| !img.src.is_empty() && !img.src.starts_with("data:");

        self.images
            .iter()
            .filter(usable)
            .find(|img| img.is_cover)
            .or_else(|| self.images.iter().find(usable))
            .map(|img| img.src.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(min = 1, max = 100000))]
    pub content: String,

    #[validate(length(max = 50))]
    pub category: Option<String>,

    /// 表单按钮：submit / draft / publish / reject
    pub action: Option<String>,

    #[serde(default)]
    pub images: Vec<PostImage>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 100000))]
    pub content: Option<String>,

    #[validate(length(max = 50))]
    pub category: Option<String>,

    pub action: Option<String>,
    pub rejection_reason: Option<String>,
    pub images: Option<Vec<PostImage>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuickRejectRequest {
    #[serde(default)]
    pub reason: String,
}

/// 内容存储的查询条件
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub author_id: Option<String>,
    pub query: Option<String>,
    pub category: Option<String>,
}

impl PostFilter {
    pub fn with_status(status: PostStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        if let Some(status) = self.status {
            if post.status != status {
                return false;
            }
        }

        if let Some(author_id) = &self.author_id {
            if &post.author_id != author_id {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if &post.category != category {
                return false;
            }
        }

        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                post.title.to_lowercase().contains(&q)
                    || post.content.to_lowercase().contains(&q)
                    || post.category.to_lowercase().contains(&q)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusStats {
    pub draft: usize,
    pub pending: usize,
    pub published: usize,
    pub rejected: usize,
}

#[derive(Debug, Serialize)]
pub struct ReviewPanel {
    pub pending_posts: Vec<Post>,
    pub stats: StatusStats,
}

/// 一次状态流转的结果：保存后的文章与本次产生的通知
#[derive(Debug, Clone, Serialize)]
pub struct PostChange {
    pub post: Post,
    pub previous_status: Option<PostStatus>,
    pub notifications: Vec<Notification>,
}

impl PostChange {
    pub fn status(&self) -> PostStatus {
        self.post.status
    }

    /// 给前端展示的提示文案
    pub fn summary(&self) -> String {
        match self.post.status {
            PostStatus::Pending if !self.notifications.is_empty() => format!(
                "Submitted for review! {} admin(s) notified.",
                self.notifications.len()
            ),
            PostStatus::Published if !self.notifications.is_empty() => {
                "Blog published! Author notified.".to_string()
            }
            PostStatus::Published if self.previous_status.is_none() => {
                "Blog published successfully!".to_string()
            }
            PostStatus::Rejected => "Blog rejected. Author notified.".to_string(),
            PostStatus::Draft => "Saved as draft.".to_string(),
            _ => "Blog updated.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_with_images(cover_url: Option<&str>, images: Vec<PostImage>) -> Post {
        let now = Utc::now();
        Post {
            id: "p1".to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            category: "General".to_string(),
            author_id: "u1".to_string(),
            cover_image_url: cover_url.map(|s| s.to_string()),
            cover_image_alt: None,
            images,
            status: PostStatus::Draft,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn image(src: &str, is_cover: bool) -> PostImage {
        PostImage {
            src: src.to_string(),
            kind: "manual".to_string(),
            name: String::new(),
            is_cover,
        }
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in PostStatus::ALL {
            assert_eq!(status.as_str().parse::<PostStatus>().unwrap(), status);
        }
        assert!("archived".parse::<PostStatus>().is_err());
    }

    #[test]
    fn test_cover_image_skips_data_urls() {
        let post = post_with_images(
            Some("data:image/png;base64,AAAA"),
            vec![image("data:image/png;base64,BBBB", true), image("/media/a.png", false)],
        );

        assert_eq!(post.cover_image(), Some("/media/a.png"));
    }

    #[test]
    fn test_cover_image_prefers_marked_cover() {
        let post = post_with_images(
            None,
            vec![image("/media/a.png", false), image("https://cdn/b.png", true)],
        );

        assert_eq!(post.cover_image(), Some("https://cdn/b.png"));
    }

    #[test]
    fn test_filter_query_is_case_insensitive() {
        let post = post_with_images(None, vec![]);
        let filter = PostFilter {
            query: Some("TIT".to_string()),
            ..Default::default()
        };

        assert!(filter.matches(&post));
        assert!(!PostFilter::with_status(PostStatus::Published).matches(&post));
    }
}
