//! 外部 AI 生成服务：文本走 Groq（OpenAI 兼容接口），图片走 Hugging Face 推理接口。
//!
//! 所有失败都转换为 `AppError::Generation`，调用方可以把错误信息直接展示给用户。

use crate::{
    config::Config,
    error::{AppError, Result},
    models::generation::{GeneratedImage, ImageStyle, DEFAULT_TONE},
    services::media::MediaService,
    utils::validation::{truncate_chars, validate_min_chars, validate_required},
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 小于等于这个大小的图片响应视为无效
const MIN_IMAGE_BYTES: usize = 1000;
const ERROR_BODY_LIMIT: usize = 300;
const CATEGORY_CONTENT_LIMIT: usize = 2000;
const MAX_SUGGESTED_CATEGORIES: usize = 3;

static TITLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]|[-*•])\s*").expect("title prefix pattern must compile"));

/// 图片模型加载中（503/529）时的重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// 响应中没有 estimated_time 时的等待时间
    pub default_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            default_wait: Duration::from_secs(8),
            max_wait: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.image_max_attempts.max(1),
            default_wait: Duration::from_secs(config.image_retry_wait_secs),
            max_wait: Duration::from_secs(config.image_retry_max_wait_secs),
        }
    }

    pub fn wait_for(&self, estimated_secs: Option<f64>) -> Duration {
        let wait = estimated_secs
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| Duration::from_secs_f64(secs.min(self.max_wait.as_secs_f64())))
            .unwrap_or(self.default_wait);
        wait.min(self.max_wait)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Clone)]
pub struct GenerationService {
    http_client: Client,
    media: MediaService,
    groq_api_key: Option<String>,
    groq_api_url: String,
    groq_model: String,
    article_timeout: Duration,
    short_timeout: Duration,
    prompt_timeout: Duration,
    min_category_content_length: usize,
    huggingface_api_key: Option<String>,
    hf_image_url: String,
    image_timeout: Duration,
    retry: RetryPolicy,
    categories: Vec<String>,
    fallback_category: String,
}

impl GenerationService {
    pub async fn new(config: &Config, media: MediaService) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("editorial-blog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let mut categories = config.categories();
        if !categories.contains(&config.fallback_category) {
            categories.push(config.fallback_category.clone());
        }

        Ok(Self {
            http_client,
            media,
            groq_api_key: config.groq_api_key.clone(),
            groq_api_url: config.groq_api_url.clone(),
            groq_model: config.groq_model.clone(),
            article_timeout: Duration::from_secs(config.article_timeout_secs),
            short_timeout: Duration::from_secs(config.short_timeout_secs),
            prompt_timeout: Duration::from_secs(config.prompt_timeout_secs),
            min_category_content_length: config.min_category_content_length,
            huggingface_api_key: config.huggingface_api_key.clone(),
            hf_image_url: config.hf_image_url.clone(),
            image_timeout: Duration::from_secs(config.image_timeout_secs),
            retry: RetryPolicy::from_config(config),
            categories,
            fallback_category: config.fallback_category.clone(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// 可供选择的分类（包含默认分类）
    pub fn allowed_categories(&self) -> &[String] {
        &self.categories
    }

    /// 生成 Markdown 格式的完整文章
    pub async fn generate_article(&self, topic: &str, tone: Option<&str>) -> Result<String> {
        validate_required(topic, "Topic")?;
        let tone = tone
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TONE);

        debug!("Generating article about {:?} ({})", topic, tone);

        let text = self
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: format!(
                            "You are an expert blog writer. Write in {} tone. Use Markdown.",
                            tone
                        ),
                    },
                    ChatMessage {
                        role: "user",
                        content: format!("Write a complete blog about: {}", topic.trim()),
                    },
                ],
                Some(0.7),
                Some(4000),
                self.article_timeout,
            )
            .await?;

        info!("Generated article ({} chars)", text.chars().count());
        Ok(text)
    }

    pub async fn generate_titles(&self, topic: &str) -> Result<Vec<String>> {
        validate_required(topic, "Topic")?;

        let text = self
            .chat(
                vec![ChatMessage {
                    role: "user",
                    content: format!(
                        "Give me 5 catchy blog titles for: {}. Return only the titles.",
                        topic.trim()
                    ),
                }],
                None,
                None,
                self.short_timeout,
            )
            .await?;

        Ok(parse_titles(&text))
    }

    /// 只从 `allowed` 中选择分类，最多 3 个，没有匹配时至少返回默认分类
    pub async fn suggest_categories(&self, content: &str, allowed: &[String]) -> Result<Vec<String>> {
        validate_min_chars(content, self.min_category_content_length, "Content")?;

        let system_prompt = format!(
            "You are a category expert.\n\
             Analyze the blog content and return EXACTLY 3 most relevant categories FROM THIS LIST ONLY:\n\
             {}\n\n\
             RULES:\n\
             1. Return ONLY the category names, one per line\n\
             2. No numbering, no extra text, no explanations\n\
             3. Never make up a category not in the list\n\
             4. If unsure return {}",
            allowed.join(", "),
            self.fallback_category
        );

        let reply = self
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: system_prompt,
                    },
                    ChatMessage {
                        role: "user",
                        content: format!(
                            "Blog content:\n\n{}",
                            truncate_chars(content, CATEGORY_CONTENT_LIMIT)
                        ),
                    },
                ],
                Some(0.1),
                Some(100),
                self.short_timeout,
            )
            .await?;

        Ok(filter_categories(&reply, allowed, &self.fallback_category))
    }

    /// 用文本模型扩写图片提示词，任何失败都返回原提示词
    pub async fn enhance_prompt(&self, prompt: &str) -> String {
        if self.groq_api_key.is_none() {
            return prompt.to_string();
        }

        let result = self
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: "You are an expert at writing image generation prompts. Enhance the user's basic prompt into a detailed, vivid description. Keep it under 100 words.".to_string(),
                    },
                    ChatMessage {
                        role: "user",
                        content: format!("Enhance this image prompt: {}", prompt),
                    },
                ],
                Some(0.8),
                Some(150),
                self.prompt_timeout,
            )
            .await;

        match result {
            Ok(enhanced) if !enhanced.trim().is_empty() => enhanced.trim().to_string(),
            Ok(_) => prompt.to_string(),
            Err(e) => {
                warn!("Prompt enhancement failed, using original prompt: {}", e);
                prompt.to_string()
            }
        }
    }

    /// 生成图片并保存到媒体目录。模型加载中（503/529）按重试策略等待后重试，
    /// 其他错误立即失败。
    pub async fn generate_image(
        &self,
        prompt: &str,
        style: ImageStyle,
        width: u32,
        height: u32,
    ) -> Result<GeneratedImage> {
        validate_required(prompt, "Prompt")?;
        let api_key = self.huggingface_api_key.as_deref().ok_or_else(|| {
            AppError::generation("HUGGINGFACE_API_KEY is not configured; image generation is unavailable")
        })?;

        let payload = json!({
            "inputs": format!("{}, {}", prompt.trim(), style.keywords()),
            "parameters": {
                "width": width,
                "height": height,
            }
        });

        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!("Image generation attempt {}/{}", attempt, max_attempts);

            let response = self
                .http_client
                .post(&self.hf_image_url)
                .bearer_auth(api_key)
                .header(ACCEPT, "image/png")
                .timeout(self.image_timeout)
                .json(&payload)
                .send()
                .await
                .map_err(|e| AppError::generation(format!("Image provider request failed: {}", e)))?;

            let status = response.status();
            let is_image = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(|ct| ct.starts_with("image/"))
                .unwrap_or(false);

            if status == StatusCode::OK && is_image {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| AppError::generation(format!("Failed to read image: {}", e)))?;

                if bytes.len() > MIN_IMAGE_BYTES {
                    let saved = self.media.save_bytes(&bytes, "png").await?;
                    info!("Generated image saved to {}", saved.file_path);
                    return Ok(saved);
                }

                return Err(AppError::generation(format!(
                    "Image provider returned an unusable image ({} bytes)",
                    bytes.len()
                )));
            }

            if is_model_loading(status) {
                let body = response.text().await.unwrap_or_default();
                let wait = self.retry.wait_for(estimated_time(&body));
                warn!(
                    "Image model not ready ({}), attempt {}/{}",
                    status.as_u16(),
                    attempt,
                    max_attempts
                );

                if attempt < max_attempts {
                    tokio::time::sleep(wait).await;
                }
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(AppError::generation(format!(
                "Image provider error {}: {}",
                status.as_u16(),
                truncate_chars(&body, ERROR_BODY_LIMIT)
            )));
        }

        Err(AppError::generation(format!(
            "Image provider still not ready after {} attempts",
            max_attempts
        )))
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage<'_>>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Result<String> {
        let api_key = self.groq_api_key.as_deref().ok_or_else(|| {
            AppError::generation("GROQ_API_KEY is not configured; text generation is unavailable")
        })?;

        let request = ChatRequest {
            model: &self.groq_model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .http_client
            .post(&self.groq_api_url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::generation(format!("Text provider request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::generation(format!(
                "Text provider error {}: {}",
                status.as_u16(),
                truncate_chars(&body, ERROR_BODY_LIMIT)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::generation(format!("Malformed text provider response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::generation("Text provider returned no choices"))
    }
}

fn is_model_loading(status: StatusCode) -> bool {
    matches!(status.as_u16(), 503 | 529)
}

fn estimated_time(body: &str) -> Option<f64> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("estimated_time")?
        .as_f64()
}

/// 拆分标题列表：去掉空行、编号和引号
pub fn parse_titles(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .map(|line| TITLE_PREFIX.replace(line, "").to_string())
        .map(|line| {
            line.trim()
                .trim_matches(|c: char| matches!(c, '"' | '“' | '”'))
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// 只保留在允许列表中的分类（去重），补上默认分类，最多 3 个
pub fn filter_categories(reply: &str, allowed: &[String], fallback: &str) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();

    for line in reply.lines().map(str::trim) {
        if allowed.iter().any(|c| c == line) && !categories.iter().any(|c| c == line) {
            categories.push(line.to_string());
        }
    }

    if !categories.iter().any(|c| c == fallback) {
        categories.push(fallback.to_string());
    }

    categories.truncate(MAX_SUGGESTED_CATEGORIES);
    categories
}
