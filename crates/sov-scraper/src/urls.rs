//! URL normalization, classification and mobile mapping.

use sov_core::UrlType;
use url::Url;

const BLOG_HOSTS: &[&str] = &["blog.naver.com", "m.blog.naver.com", "brunch.co.kr"];
const VIEW_HOSTS: &[&str] = &[
    "cafe.naver.com",
    "m.cafe.naver.com",
    "post.naver.com",
    "m.post.naver.com",
    "in.naver.com",
];
const NEWS_HOSTS: &[&str] = &["n.news.naver.com", "news.naver.com", "m.news.naver.com"];

/// Canonical form used for de-duplication: no fragment, no `utm_*`
/// parameters, no trailing slash, lower-cased host.
///
/// Unparseable input is returned trimmed.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.to_ascii_lowercase().starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    let mut out = url.to_string();
    if url.query().is_none() && url.path() == "/" && out.ends_with('/') {
        out.pop();
    }
    out
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}

/// Chooses the rendering family for a linked page.
pub fn classify_url(raw: &str) -> UrlType {
    let Ok(url) = Url::parse(raw.trim()) else {
        return UrlType::Other;
    };
    let host = host_of(&url);

    if BLOG_HOSTS.contains(&host.as_str()) || host.ends_with(".tistory.com") {
        return UrlType::Blog;
    }
    if VIEW_HOSTS.contains(&host.as_str()) {
        return UrlType::View;
    }
    let path = url.path().to_ascii_lowercase();
    if NEWS_HOSTS.contains(&host.as_str())
        || host.starts_with("news.")
        || path.contains("/news/")
        || path.contains("/article/")
    {
        return UrlType::News;
    }
    UrlType::Other
}

/// `true` for links into user-generated content hosts (blogs, cafes, posts).
pub fn is_content_host(raw: &str) -> bool {
    matches!(classify_url(raw), UrlType::Blog | UrlType::View)
}

/// Maps desktop blog and cafe links to their mobile-rendered equivalents.
///
/// Already-mobile and unrelated URLs are returned unchanged.
pub fn to_mobile_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };
    let host = host_of(&url);

    match host.as_str() {
        "blog.naver.com" => {
            if let Some((blog_id, log_no)) = blog_post_ids(&url) {
                return format!("https://m.blog.naver.com/{blog_id}/{log_no}");
            }
            swap_host(url, "m.blog.naver.com")
        }
        "cafe.naver.com" => swap_host(url, "m.cafe.naver.com"),
        _ => raw.to_string(),
    }
}

fn swap_host(mut url: Url, host: &str) -> String {
    if url.set_host(Some(host)).is_err() {
        return url.to_string();
    }
    url.to_string()
}

/// Extracts `(blogId, logNo)` from either the path form
/// `/{blogId}/{logNo}` or the `PostView` query form.
fn blog_post_ids(url: &Url) -> Option<(String, String)> {
    let query_value = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    };
    if let (Some(blog_id), Some(log_no)) = (query_value("blogId"), query_value("logNo")) {
        return Some((blog_id, log_no));
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let blog_id = segments.next()?;
    let log_no = segments.next()?;
    if segments.next().is_some() || !log_no.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((blog_id.to_string(), log_no.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_url_drops_fragment_tracking_and_trailing_slash() {
        assert_eq!(
            normalize_url("https://Blog.Naver.com/user/123/?utm_source=x&a=1#top"),
            "https://blog.naver.com/user/123?a=1"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
        assert_eq!(
            normalize_url("https://example.com/path?utm_medium=m"),
            "https://example.com/path"
        );
    }

    #[test]
    fn normalize_url_makes_duplicates_equal() {
        assert_eq!(
            normalize_url("https://cafe.naver.com/abc/1#comment"),
            normalize_url("https://cafe.naver.com/abc/1/")
        );
    }

    #[test]
    fn normalize_url_keeps_unparseable_input() {
        assert_eq!(normalize_url("  not a url "), "not a url");
    }

    #[test]
    fn classify_url_by_host_and_path() {
        assert_eq!(classify_url("https://blog.naver.com/a/1"), UrlType::Blog);
        assert_eq!(classify_url("https://m.blog.naver.com/a/1"), UrlType::Blog);
        assert_eq!(classify_url("https://someone.tistory.com/12"), UrlType::Blog);
        assert_eq!(classify_url("https://brunch.co.kr/@x/3"), UrlType::Blog);
        assert_eq!(classify_url("https://cafe.naver.com/club/9"), UrlType::View);
        assert_eq!(classify_url("https://post.naver.com/viewer?x=1"), UrlType::View);
        assert_eq!(classify_url("https://in.naver.com/creator"), UrlType::View);
        assert_eq!(classify_url("https://n.news.naver.com/mnews/1"), UrlType::News);
        assert_eq!(classify_url("https://news.example.co.kr/a"), UrlType::News);
        assert_eq!(classify_url("https://example.com/article/55"), UrlType::News);
        assert_eq!(classify_url("https://example.com/shop"), UrlType::Other);
        assert_eq!(classify_url("garbage"), UrlType::Other);
    }

    #[test]
    fn mobile_url_maps_blog_path_and_query_forms() {
        assert_eq!(
            to_mobile_url("https://blog.naver.com/writer/223344"),
            "https://m.blog.naver.com/writer/223344"
        );
        assert_eq!(
            to_mobile_url("https://blog.naver.com/PostView.naver?blogId=writer&logNo=223344"),
            "https://m.blog.naver.com/writer/223344"
        );
    }

    #[test]
    fn mobile_url_maps_cafe_and_leaves_others() {
        assert_eq!(
            to_mobile_url("https://cafe.naver.com/club/77"),
            "https://m.cafe.naver.com/club/77"
        );
        assert_eq!(
            to_mobile_url("https://m.blog.naver.com/writer/1"),
            "https://m.blog.naver.com/writer/1"
        );
        assert_eq!(
            to_mobile_url("https://example.com/a"),
            "https://example.com/a"
        );
    }

    #[test]
    fn content_hosts_are_blog_and_view() {
        assert!(is_content_host("https://blog.naver.com/a/1"));
        assert!(is_content_host("https://cafe.naver.com/a/1"));
        assert!(!is_content_host("https://n.news.naver.com/a/1"));
    }
}
