use super::*;

fn ad() -> AdCredentials {
    AdCredentials {
        api_key: "ad-key".to_owned(),
        secret_key: "ad-secret".to_owned(),
        customer_id: "12345".to_owned(),
    }
}

#[test]
fn base_urls_are_normalised_for_join() {
    let client = SearchAdClient::with_base_urls(
        Some(ad()),
        None,
        5,
        "https://api.searchad.naver.com",
        "https://openapi.naver.com/",
    )
    .expect("client construction should not fail");
    assert_eq!(
        client.ad_join("keywordstool").unwrap().as_str(),
        "https://api.searchad.naver.com/keywordstool"
    );
    assert_eq!(
        client.open_join("v1/search/blog.json").unwrap().as_str(),
        "https://openapi.naver.com/v1/search/blog.json"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = SearchAdClient::with_base_urls(None, None, 5, "not a url", "https://x.test")
        .err()
        .unwrap();
    assert!(matches!(err, SearchAdError::InvalidBaseUrl { .. }));
}

#[test]
fn cache_key_is_trimmed_and_lowercased() {
    assert_eq!(cache_key("  Camping Chair "), "camping chair");
}

#[test]
fn credentials_debug_redacts_secrets() {
    let rendered = format!("{:?}", ad());
    assert!(!rendered.contains("ad-secret"));
    assert!(!rendered.contains("ad-key"));
    assert!(rendered.contains("12345"));
}

#[tokio::test]
async fn missing_credentials_fail_without_request() {
    let client = SearchAdClient::new(None, None, 5).unwrap();
    assert!(matches!(
        client.keyword_volume("전기차").await,
        Err(SearchAdError::MissingCredentials(_))
    ));
    assert!(matches!(
        client.channel_counts("전기차").await,
        Err(SearchAdError::MissingCredentials(_))
    ));
}
