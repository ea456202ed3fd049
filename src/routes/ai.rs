use crate::{
    error::{AppError, Result},
    models::generation::*,
    state::AppState,
    utils::{markdown, middleware::CurrentActor},
};
use axum::{extract::State, response::Json, routing::post, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const DEFAULT_IMAGE_SIZE: u32 = 768;
const MIN_IMAGE_SIZE: u32 = 64;
const MAX_IMAGE_SIZE: u32 = 2048;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-article", post(generate_article))
        .route("/generate-titles", post(generate_titles))
        .route("/suggest-categories", post(suggest_categories))
        .route("/generate-image", post(generate_image))
}

/// 生成文章，返回去掉 Markdown 标记后的正文
/// POST /api/blog/ai/generate-article
pub async fn generate_article(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<GenerateArticleRequest>,
) -> Result<Json<Value>> {
    debug!("Article generation requested by {}", actor.id);

    let raw = app_state
        .generation_service
        .generate_article(&request.topic, request.tone.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "content": markdown::normalize(&raw) }
    })))
}

/// POST /api/blog/ai/generate-titles
pub async fn generate_titles(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(_actor): CurrentActor,
    Json(request): Json<GenerateTitlesRequest>,
) -> Result<Json<Value>> {
    let titles = app_state.generation_service.generate_titles(&request.topic).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "titles": titles }
    })))
}

/// POST /api/blog/ai/suggest-categories
pub async fn suggest_categories(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(_actor): CurrentActor,
    Json(request): Json<SuggestCategoriesRequest>,
) -> Result<Json<Value>> {
    let generation = &app_state.generation_service;
    let categories = generation
        .suggest_categories(&request.content, generation.allowed_categories())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "categories": categories }
    })))
}

/// POST /api/blog/ai/generate-image
pub async fn generate_image(
    State(app_state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<GenerateImageRequest>,
) -> Result<Json<Value>> {
    let width = image_dimension(request.width, "width")?;
    let height = image_dimension(request.height, "height")?;
    let style = ImageStyle::from_name(request.style.as_deref().unwrap_or_default());

    if request.prompt.trim().is_empty() {
        return Err(AppError::validation("Please enter a prompt."));
    }

    let prompt = if request.enhance {
        app_state.generation_service.enhance_prompt(request.prompt.trim()).await
    } else {
        request.prompt.trim().to_string()
    };

    debug!("Image generation requested by {} ({:?})", actor.id, style);

    let image = app_state
        .generation_service
        .generate_image(&prompt, style, width, height)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "image_url": image.image_url,
            "file_path": image.file_path,
            "prompt": prompt,
            "style": style,
        }
    })))
}

fn image_dimension(value: Option<u32>, name: &str) -> Result<u32> {
    let value = value.unwrap_or(DEFAULT_IMAGE_SIZE);
    if !(MIN_IMAGE_SIZE..=MAX_IMAGE_SIZE).contains(&value) {
        return Err(AppError::Validation(format!(
            "Image {} must be between {} and {}",
            name, MIN_IMAGE_SIZE, MAX_IMAGE_SIZE
        )));
    }
    Ok(value)
}
