use editorial_blog::{
    config::Config,
    error::AppError,
    models::generation::ImageStyle,
    services::{GenerationService, MediaService, RetryPolicy},
};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const IMAGE_PATH: &str = "/models/test-sdxl";
const CHAT_PATH: &str = "/openai/v1/chat/completions";

struct Gateway {
    service: GenerationService,
    media_dir: TempDir,
}

async fn gateway(server: &MockServer, with_keys: bool) -> Gateway {
    let media_dir = TempDir::new().unwrap();
    let config = Config {
        groq_api_key: with_keys.then(|| "groq-key".to_string()),
        groq_api_url: format!("{}{}", server.uri(), CHAT_PATH),
        huggingface_api_key: with_keys.then(|| "hf-key".to_string()),
        hf_image_url: format!("{}{}", server.uri(), IMAGE_PATH),
        media_root: media_dir.path().to_string_lossy().to_string(),
        ..Config::default()
    };

    let media = MediaService::new(&config).await.unwrap();
    let service = GenerationService::new(&config, media)
        .await
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 4,
            default_wait: Duration::from_millis(10),
            max_wait: Duration::from_millis(20),
        });

    Gateway { service, media_dir }
}

fn png_body() -> Vec<u8> {
    vec![0x89; 4096]
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

#[tokio::test]
async fn image_generation_retries_while_model_is_loading() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "estimated_time": 20.0 })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(header("authorization", "Bearer hf-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_body(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let image = g
        .service
        .generate_image("a lighthouse at dusk", ImageStyle::Cinematic, 768, 768)
        .await
        .unwrap();

    assert!(image.image_url.starts_with("/media/blog_images/"));
    let saved = std::fs::read(g.media_dir.path().join(&image.file_path)).unwrap();
    assert_eq!(saved.len(), 4096);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["inputs"],
        "a lighthouse at dusk, cinematic lighting, ultra detailed, film still"
    );
    assert_eq!(body["parameters"]["width"], 768);
}

#[tokio::test]
async fn image_generation_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad prompt"))
        .expect(1)
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let err = g
        .service
        .generate_image("cat", ImageStyle::Photorealistic, 768, 768)
        .await
        .unwrap_err();

    match err {
        AppError::Generation(message) => {
            assert!(message.contains("400"));
            assert!(message.contains("bad prompt"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn image_generation_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(529))
        .expect(4)
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let err = g
        .service
        .generate_image("cat", ImageStyle::Anime, 512, 512)
        .await
        .unwrap_err();

    match err {
        AppError::Generation(message) => assert!(message.contains("after 4 attempts")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn image_generation_rejects_non_image_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "oops" })))
        .expect(1)
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let result = g
        .service
        .generate_image("cat", ImageStyle::Minimalist, 768, 768)
        .await;

    assert!(matches!(result, Err(AppError::Generation(_))));
}

#[tokio::test]
async fn missing_keys_fail_without_calling_providers() {
    let server = MockServer::start().await;
    let g = gateway(&server, false).await;

    let image = g
        .service
        .generate_image("cat", ImageStyle::Photorealistic, 768, 768)
        .await
        .unwrap_err();
    assert!(matches!(image, AppError::Generation(ref m) if m.contains("HUGGINGFACE_API_KEY")));

    let article = g.service.generate_article("Rust", None).await.unwrap_err();
    assert!(matches!(article, AppError::Generation(ref m) if m.contains("GROQ_API_KEY")));

    assert_eq!(g.service.enhance_prompt("a cat").await, "a cat");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn suggested_categories_stay_within_allowed_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer groq-key"))
        .respond_with(chat_reply("Technology\nQuantum Cooking\nTechnology\nEducation\nHealth"))
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let allowed = g.service.allowed_categories().to_vec();
    let content = "Rust makes systems programming approachable. ".repeat(5);

    let categories = g.service.suggest_categories(&content, &allowed).await.unwrap();

    assert!(categories.len() <= 3);
    assert!(categories.iter().all(|c| allowed.contains(c)));
    assert_eq!(categories, vec!["Technology", "Education", "Health"]);
}

#[tokio::test]
async fn suggested_categories_fall_back_to_general() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(chat_reply("Gardening\nKnitting"))
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let allowed = g.service.allowed_categories().to_vec();
    let content = "x".repeat(150);

    let categories = g.service.suggest_categories(&content, &allowed).await.unwrap();

    assert_eq!(categories, vec!["General"]);
}

#[tokio::test]
async fn short_content_is_not_sent_for_categorisation() {
    let server = MockServer::start().await;
    let g = gateway(&server, true).await;
    let allowed = g.service.allowed_categories().to_vec();

    let err = g.service.suggest_categories("too short", &allowed).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn titles_are_cleaned_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(chat_reply("1. \"Borrow Checker 101\"\n2. Lifetimes Demystified\n\n3) Async Without Tears"))
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let titles = g.service.generate_titles("Rust").await.unwrap();

    assert_eq!(
        titles,
        vec!["Borrow Checker 101", "Lifetimes Demystified", "Async Without Tears"]
    );
}

#[tokio::test]
async fn text_provider_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;

    let err = g.service.generate_article("Rust", Some("Casual")).await.unwrap_err();
    assert!(matches!(err, AppError::Generation(ref m) if m.contains("500")));

    assert_eq!(g.service.enhance_prompt("a cat").await, "a cat");
}

#[tokio::test]
async fn article_uses_default_tone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(chat_reply("# Rust\n\n**Fast** and safe."))
        .expect(1)
        .mount(&server)
        .await;

    let g = gateway(&server, true).await;
    let article = g.service.generate_article("Rust", None).await.unwrap();
    assert_eq!(article, "# Rust\n\n**Fast** and safe.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "llama-3.1-8b-instant");
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("Professional yet friendly"));
}
