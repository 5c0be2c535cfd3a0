use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

/// Returns the same HTML (or error) for every render and records calls.
struct FixedRenderer {
    html: Result<String, String>,
    calls: Mutex<Vec<(String, RenderProfile)>>,
}

impl FixedRenderer {
    fn ok(html: &str) -> Arc<Self> {
        Arc::new(Self {
            html: Ok(html.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            html: Err("net::ERR_CONNECTION_REFUSED".to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, RenderProfile)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for FixedRenderer {
    async fn render(
        &self,
        url: &str,
        profile: RenderProfile,
        _timeout: Duration,
    ) -> Result<String, ScraperError> {
        self.calls.lock().unwrap().push((url.to_string(), profile));
        self.html.clone().map_err(ScraperError::Browser)
    }
}

fn config() -> ExtractorConfig {
    ExtractorConfig {
        http_timeout: Duration::from_secs(5),
        browser_timeout: Duration::from_secs(5),
        max_chars: 5_000,
        http_retries: 0,
        backoff_base_ms: 0,
    }
}

fn extractor(renderer: Arc<FixedRenderer>) -> ContentExtractor {
    ContentExtractor::new(renderer, config()).unwrap()
}

fn article(words: usize) -> String {
    format!(
        "<html><body><nav>menu</nav><article><p>{}</p></article></body></html>",
        "전기차 시장 ".repeat(words)
    )
}

const BLOG_URL: &str = "https://blog.naver.com/evfan/223344";
const LONG_SNIPPET: &str = "테슬라 모델Y를 한 달 동안 출퇴근용으로 타보면서 느낀 장점과 단점을 정리했습니다. 충전 비용도 비교.";

#[tokio::test]
async fn other_page_accepts_long_plain_http_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article(100)))
        .mount(&server)
        .await;

    let renderer = FixedRenderer::ok("<body>unused</body>");
    let result = extractor(renderer.clone())
        .extract(&format!("{}/story", server.uri()), None)
        .await;

    assert_eq!(result.status, ExtractionStatus::Success);
    assert_eq!(result.url_type, UrlType::Other);
    assert!(result.content.unwrap().starts_with("전기차 시장"));
    assert!(renderer.calls().is_empty());
}

#[tokio::test]
async fn short_http_page_falls_through_to_article_browser() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article(5)))
        .mount(&server)
        .await;

    let renderer = FixedRenderer::ok(&article(20));
    let url = format!("{}/news/1", server.uri());
    let result = extractor(renderer.clone()).extract(&url, None).await;

    assert_eq!(result.status, ExtractionStatus::Success);
    assert_eq!(result.url_type, UrlType::News);
    assert_eq!(renderer.calls(), vec![(url, RenderProfile::Desktop)]);
}

#[tokio::test]
async fn blocked_page_and_failed_render_use_long_snippet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = extractor(FixedRenderer::failing())
        .extract(&format!("{}/story", server.uri()), Some(LONG_SNIPPET))
        .await;

    assert_eq!(result.status, ExtractionStatus::SuccessApi);
    assert_eq!(result.content.as_deref(), Some(LONG_SNIPPET));
}

#[tokio::test]
async fn total_failure_with_short_snippet_is_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = extractor(FixedRenderer::failing())
        .extract(&format!("{}/story", server.uri()), Some("짧은 설명"))
        .await;

    assert_eq!(result.status, ExtractionStatus::Failed);
    assert!(result.content.is_none());
    assert_eq!(result.url_type, UrlType::Other);
}

#[tokio::test]
async fn blog_renders_mobile_page_and_reads_post_container() {
    let html = format!(
        r#"<body><div class="sidebar">이웃 블로그 목록</div>
        <div class="se-main-container">{}</div></body>"#,
        "모델Y 주행 후기 ".repeat(20)
    );
    let renderer = FixedRenderer::ok(&html);
    let result = extractor(renderer.clone()).extract(BLOG_URL, None).await;

    assert_eq!(result.status, ExtractionStatus::Success);
    assert_eq!(result.url_type, UrlType::Blog);
    assert!(!result.content.unwrap().contains("이웃"));
    assert_eq!(
        renderer.calls(),
        vec![(
            "https://m.blog.naver.com/evfan/223344".to_string(),
            RenderProfile::Mobile
        )]
    );
}

#[tokio::test]
async fn content_is_truncated_to_cap() {
    let html = format!(
        r#"<body><div class="se-main-container">{}</div></body>"#,
        "가".repeat(7_000)
    );
    let extractor = ContentExtractor::new(
        FixedRenderer::ok(&html),
        ExtractorConfig {
            max_chars: 5_000,
            ..config()
        },
    )
    .unwrap();

    let content = extractor.extract(BLOG_URL, None).await.content.unwrap();
    assert_eq!(char_len(&content), 5_000);
}

const SHORT_BLOG: &str = r#"<html><head>
    <meta property="og:title" content="테슬라 모델Y 사진 후기">
    <meta property="og:description" content="사진으로 보는 한 달">
    </head><body><div class="se-main-container">
      <img src="https://cdn.example.com/photo1.jpg">
      <p>사진 위주</p></div></body></html>"#;

#[tokio::test]
async fn short_blog_falls_back_to_metadata_with_brand_mention() {
    let brands = vec!["테슬라".to_string()];
    let request = ExtractRequest {
        search_title: Some("모델Y 후기"),
        brands: &brands,
        ..ExtractRequest::new(BLOG_URL)
    };
    let result = extractor(FixedRenderer::ok(SHORT_BLOG))
        .extract_request(&request)
        .await;

    assert_eq!(result.status, ExtractionStatus::SuccessMetadata);
    assert_eq!(
        result.content.as_deref(),
        Some("테슬라 모델Y 사진 후기 사진으로 보는 한 달 모델Y 후기")
    );
}

#[tokio::test]
async fn metadata_without_brand_mention_fails() {
    let brands = vec!["Hyundai".to_string()];
    let request = ExtractRequest {
        brands: &brands,
        ..ExtractRequest::new(BLOG_URL)
    };
    let result = extractor(FixedRenderer::ok(SHORT_BLOG))
        .extract_request(&request)
        .await;

    assert_eq!(result.status, ExtractionStatus::Failed);
    assert!(result.content.is_none());
}

async fn vision_server(expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "TESLA Model Y 롱레인지 시승 이벤트" } }]
        })))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

fn vision_client(server: &MockServer) -> VisionClient {
    VisionClient::new(
        reqwest::Client::new(),
        "sk-test",
        "gpt-4o-mini",
        Duration::from_secs(5),
    )
    .with_endpoint(format!("{}/v1/chat/completions", server.uri()))
}

#[tokio::test]
async fn short_blog_with_images_uses_ocr() {
    let server = vision_server(1).await;
    let extractor = extractor(FixedRenderer::ok(SHORT_BLOG)).with_vision(vision_client(&server));

    let result = extractor.extract(BLOG_URL, None).await;
    assert_eq!(result.status, ExtractionStatus::SuccessOcr);
    assert_eq!(
        result.content.as_deref(),
        Some("TESLA Model Y 롱레인지 시승 이벤트")
    );
}

#[tokio::test]
async fn long_snippet_suppresses_ocr() {
    let server = vision_server(0).await;
    let extractor = extractor(FixedRenderer::ok(SHORT_BLOG)).with_vision(vision_client(&server));

    let result = extractor.extract(BLOG_URL, Some(LONG_SNIPPET)).await;
    assert_eq!(result.status, ExtractionStatus::SuccessApi);
}

#[tokio::test]
async fn invalid_url_fails_without_fallbacks() {
    let server = vision_server(0).await;
    let brands = vec!["테슬라".to_string()];
    let request = ExtractRequest {
        search_title: Some("테슬라 가격 인하"),
        brands: &brands,
        ..ExtractRequest::new("not a url at all")
    };
    let result = extractor(FixedRenderer::ok(SHORT_BLOG))
        .with_vision(vision_client(&server))
        .extract_request(&request)
        .await;

    assert_eq!(result.status, ExtractionStatus::Failed);
    assert_eq!(result.url_type, UrlType::Other);
}
