use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_format: String,

    // 用户目录：逗号分隔的 "id:username" 列表，这些用户具有审核权限
    pub staff_users: String,

    // Workflow configuration
    pub workflow_privileged_fallback: String,
    pub posts_per_page: usize,
    pub notifications_limit: usize,
    pub post_categories: String,
    pub fallback_category: String,

    // Text generation (Groq, OpenAI-compatible)
    pub groq_api_key: Option<String>,
    pub groq_api_url: String,
    pub groq_model: String,
    pub article_timeout_secs: u64,
    pub short_timeout_secs: u64,
    pub prompt_timeout_secs: u64,
    pub min_category_content_length: usize,

    // Image generation (Hugging Face inference)
    pub huggingface_api_key: Option<String>,
    pub hf_image_url: String,
    pub image_timeout_secs: u64,
    pub image_max_attempts: u32,
    pub image_retry_wait_secs: u64,
    pub image_retry_max_wait_secs: u64,

    // Media storage
    pub media_root: String,
    pub media_url: String,

    // CORS configuration
    pub cors_allowed_origins: String,

    // Rate limiting (AI endpoints)
    pub rate_limit_requests: u32,
}

pub const DEFAULT_MEDIA_URL: &str = "/media";

pub const DEFAULT_CATEGORIES: &str =
    "Technology,Education,Health,Travel,Business,Lifestyle,Sports,General";

fn hf_model_url(model: &str) -> String {
    format!("https://router.huggingface.co/hf-inference/models/{}", model)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: "plain".to_string(),
            staff_users: String::new(),
            workflow_privileged_fallback: "publish".to_string(),
            posts_per_page: 10,
            notifications_limit: 50,
            post_categories: DEFAULT_CATEGORIES.to_string(),
            fallback_category: "General".to_string(),
            groq_api_key: None,
            groq_api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            groq_model: "llama-3.1-8b-instant".to_string(),
            article_timeout_secs: 120,
            short_timeout_secs: 30,
            prompt_timeout_secs: 15,
            min_category_content_length: 100,
            huggingface_api_key: None,
            hf_image_url: hf_model_url("stabilityai/stable-diffusion-xl-base-1.0"),
            image_timeout_secs: 180,
            image_max_attempts: 4,
            image_retry_wait_secs: 8,
            image_retry_max_wait_secs: 15,
            media_root: "media".to_string(),
            media_url: DEFAULT_MEDIA_URL.to_string(),
            cors_allowed_origins: "http://localhost:3001".to_string(),
            rate_limit_requests: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let hf_image_url = match env::var("HF_IMAGE_URL") {
            Ok(url) => url,
            Err(_) => env::var("HF_IMAGE_MODEL")
                .map(|model| hf_model_url(&model))
                .unwrap_or(defaults.hf_image_url),
        };

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: env::var("LOG_FORMAT").unwrap_or(defaults.log_format),

            staff_users: env::var("STAFF_USERS").unwrap_or_default(),

            workflow_privileged_fallback: env::var("WORKFLOW_PRIVILEGED_FALLBACK")
                .unwrap_or(defaults.workflow_privileged_fallback),
            posts_per_page: env::var("POSTS_PER_PAGE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            notifications_limit: env::var("NOTIFICATIONS_LIMIT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            post_categories: env::var("POST_CATEGORIES").unwrap_or(defaults.post_categories),
            fallback_category: env::var("FALLBACK_CATEGORY").unwrap_or(defaults.fallback_category),

            groq_api_key: env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            groq_api_url: env::var("GROQ_API_URL").unwrap_or(defaults.groq_api_url),
            groq_model: env::var("GROQ_MODEL").unwrap_or(defaults.groq_model),
            article_timeout_secs: env::var("ARTICLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            short_timeout_secs: env::var("SHORT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            prompt_timeout_secs: env::var("PROMPT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()?,
            min_category_content_length: env::var("MIN_CATEGORY_CONTENT_LENGTH")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            huggingface_api_key: env::var("HUGGINGFACE_API_KEY").ok().filter(|k| !k.is_empty()),
            hf_image_url,
            image_timeout_secs: env::var("IMAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "180".to_string())
                .parse()?,
            image_max_attempts: env::var("IMAGE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            image_retry_wait_secs: env::var("IMAGE_RETRY_WAIT_SECS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()?,
            image_retry_max_wait_secs: env::var("IMAGE_RETRY_MAX_WAIT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()?,

            media_root: env::var("MEDIA_ROOT").unwrap_or(defaults.media_root),
            media_url: env::var("MEDIA_URL")
                .map(|url| media_mount_path(&url))
                .unwrap_or(defaults.media_url),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),

            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
        })
    }

    /// 配置的文章分类列表（保持顺序，去掉空项）
    pub fn categories(&self) -> Vec<String> {
        self.post_categories
            .split(',')
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect()
    }

    /// 媒体文件的挂载路径，如 `/media`
    pub fn media_mount(&self) -> String {
        media_mount_path(&self.media_url)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// 规范化 MEDIA_URL：去掉结尾的 `/`，补上开头的 `/`，为空时回落到 `/media`
pub fn media_mount_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_MEDIA_URL.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_mount_path() {
        assert_eq!(media_mount_path("/"), "/media");
        assert_eq!(media_mount_path("  "), "/media");
        assert_eq!(media_mount_path("uploads/"), "/uploads");
        assert_eq!(media_mount_path("/static/files/"), "/static/files");

        let config = Config {
            media_url: "/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.media_mount(), "/media");
    }

    #[test]
    fn test_default_categories_include_fallback() {
        let config = Config::default();
        let categories = config.categories();

        assert_eq!(categories.len(), 8);
        assert!(categories.contains(&config.fallback_category));
    }

    #[test]
    fn test_categories_skip_blank_entries() {
        let config = Config {
            post_categories: " Rust , ,Go,".to_string(),
            ..Config::default()
        };

        assert_eq!(config.categories(), vec!["Rust".to_string(), "Go".to_string()]);
    }
}
