use crate::{
    config::Config,
    error::{AppError, Result},
    models::{generation::GeneratedImage, post::PostImage},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

const IMAGE_FOLDER: &str = "blog_images";

#[derive(Clone)]
pub struct MediaService {
    media_root: PathBuf,
    media_url: String,
}

/// 处理后的文章图片与封面
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedImages {
    pub images: Vec<PostImage>,
    pub cover_url: Option<String>,
    pub cover_alt: Option<String>,
}

impl MediaService {
    pub async fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            media_root: PathBuf::from(&config.media_root),
            media_url: config.media_mount(),
        })
    }

    /// 保存图片字节，返回浏览器可访问的 URL 和相对路径
    pub async fn save_bytes(&self, bytes: &[u8], ext: &str) -> Result<GeneratedImage> {
        let hex = Uuid::new_v4().simple().to_string();
        let filename = format!("{}.{}", &hex[..16], ext);
        let file_path = format!("{}/{}", IMAGE_FOLDER, filename);

        let folder = self.media_root.join(IMAGE_FOLDER);
        tokio::fs::create_dir_all(&folder).await?;
        tokio::fs::write(folder.join(&filename), bytes).await?;

        debug!("Saved image {} ({} bytes)", file_path, bytes.len());

        Ok(GeneratedImage {
            image_url: format!("{}/{}", self.media_url, file_path),
            file_path,
        })
    }

    /// 解码 `data:image/...;base64,` 并保存
    pub async fn save_data_url(&self, data_url: &str) -> Result<String> {
        let (header, encoded) = data_url
            .split_once(";base64,")
            .ok_or_else(|| AppError::FileUpload("Malformed data URL".to_string()))?;

        let ext = image_extension(header);
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::FileUpload(format!("Invalid base64 image: {}", e)))?;

        Ok(self.save_bytes(&bytes, ext).await?.image_url)
    }

    /// 整理文章图片：data URL 落盘，外链和已保存路径保留，其他来源丢弃。
    /// 封面取标记为封面的图片，否则取第一张。
    pub async fn process_images(&self, images: Vec<PostImage>, default_alt: &str) -> Result<ProcessedImages> {
        let mut processed = ProcessedImages::default();

        for (index, image) in images.into_iter().enumerate() {
            if image.src.is_empty() {
                continue;
            }

            let src = if image.src.starts_with("data:image") {
                match self.save_data_url(&image.src).await {
                    Ok(url) => url,
                    Err(e) => {
                        warn!("Failed to save image {}: {}", index + 1, e);
                        continue;
                    }
                }
            } else if self.is_kept_source(&image.src) {
                image.src.clone()
            } else {
                debug!("Skipping unsupported image source at position {}", index + 1);
                continue;
            };

            if image.is_cover || processed.cover_url.is_none() {
                processed.cover_url = Some(src.clone());
                processed.cover_alt = Some(if image.name.is_empty() {
                    default_alt.to_string()
                } else {
                    image.name.clone()
                });
            }

            let name = if image.name.is_empty() {
                format!("Image {}", index + 1)
            } else {
                image.name
            };

            processed.images.push(PostImage {
                src,
                kind: image.kind,
                name,
                is_cover: image.is_cover,
            });
        }

        Ok(processed)
    }

    fn is_kept_source(&self, src: &str) -> bool {
        src.starts_with("http://")
            || src.starts_with("https://")
            || src.starts_with(&format!("{}/", self.media_url))
    }
}

/// 由 data URL 头部推断扩展名
fn image_extension(header: &str) -> &'static str {
    let subtype = header.rsplit('/').next().unwrap_or_default().to_lowercase();
    match subtype.as_str() {
        "jpeg" | "jpg" => "jpg",
        "gif" => "gif",
        "webp" => "webp",
        "bmp" => "bmp",
        _ => "png",
    }
}
