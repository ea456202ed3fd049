use serde::{Deserialize, Serialize};

pub const DEFAULT_TONE: &str = "Professional yet friendly";

#[derive(Debug, Deserialize)]
pub struct GenerateArticleRequest {
    #[serde(default)]
    pub topic: String,
    pub tone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateTitlesRequest {
    #[serde(default)]
    pub topic: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestCategoriesRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: String,
    pub style: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// 先用文本模型扩写提示词
    #[serde(default)]
    pub enhance: bool,
}

/// 图片风格，决定追加到提示词后的关键词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageStyle {
    Photorealistic,
    DigitalArt,
    Anime,
    Illustration,
    Cinematic,
    Minimalist,
}

impl ImageStyle {
    /// 未知风格按写实处理
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "digital-art" => Self::DigitalArt,
            "anime" => Self::Anime,
            "illustration" => Self::Illustration,
            "cinematic" => Self::Cinematic,
            "minimalist" => Self::Minimalist,
            _ => Self::Photorealistic,
        }
    }

    pub fn keywords(&self) -> &'static str {
        match self {
            Self::Photorealistic => "high quality, highly detailed, realistic, professional photography, 4k",
            Self::DigitalArt => "digital art, highly detailed, vibrant colors, concept art",
            Self::Anime => "anime style, manga, detailed illustration",
            Self::Illustration => "illustration, detailed, clean lines, artstation",
            Self::Cinematic => "cinematic lighting, ultra detailed, film still",
            Self::Minimalist => "minimalist, clean, simple composition",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedImage {
    pub image_url: String,
    pub file_path: String,
}
