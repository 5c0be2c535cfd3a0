use super::*;

const SERP: &str = r#"<html><body>
<div class="api_subject_bx">
  <h2 class="api_title">인기글</h2>
  <ul>
    <li><a class="title_link" href="https://blog.naver.com/a/1">테슬라 모델Y 후기</a>
        <div class="dsc_txt">한 달 타본 느낌</div></li>
    <li><a class="title_link" href="https://blog.naver.com/a/1#comments">테슬라 모델Y 후기 (중복)</a></li>
    <li><a class="title_link" href="https://cafe.naver.com/ev/22">아이오닉 충전 팁</a></li>
  </ul>
</div>
<section class="sc_new sp_nnews">
  <h2 class="api_title">뉴스</h2>
  <ul class="list_news">
    <li class="bx"><a class="info press" href="https://press.example.com">전자신문</a>
      <span class="info">3시간 전</span>
      <a class="news_tit" href="https://n.news.naver.com/article/1">현대차 전기차 판매 증가</a>
      <div class="news_dsc">현대차가 발표했다</div></li>
    <li class="bx"><a class="news_tit" href="https://news.example.com/2">테슬라 가격 인하</a></li>
    <li class="bx"><a class="news_tit" href="https://news.example.com/3">충전 인프라 확대</a></li>
  </ul>
</section>
<div class="api_subject_bx">
  <h2 class="api_title">관련 뉴스 모음</h2>
  <ul><li><a href="https://news.example.com/dup">duplicate news</a></li></ul>
</div>
<section class="sp_nreview">
  <ul>
    <li><a class="title_link" href="https://blog.naver.com/b/7">리뷰 글</a>
        <a class="dsc_link" href="https://blog.naver.com/b/7">요약</a></li>
    <li><a href="https://shopping.example.com/x">쇼핑 링크</a></li>
  </ul>
</section>
<div id="place-main-section-root">
  <ul>
    <li data-ad="1"><a href="https://place.example.com/ad"><span class="place_bluelink">광고 매장</span></a></li>
    <li><a href="https://place.example.com/1"><span class="place_bluelink">테슬라 강남</span></a></li>
  </ul>
</div>
</body></html>"#;

fn titles(sections: &[Section]) -> Vec<String> {
    sections.iter().map(|s| s.title.clone()).collect()
}

#[test]
fn sections_are_in_page_order_with_place_first() {
    let sections = parse_sections(SERP);
    assert_eq!(titles(&sections), vec!["Place", "인기글", "News", "VIEW"]);
}

#[test]
fn place_section_excludes_ads_and_ranks_sequentially() {
    let sections = parse_sections(SERP);
    let place = &sections[0];
    assert_eq!(place.kind, SectionKind::Place);
    assert_eq!(place.posts.len(), 1);
    assert_eq!(place.posts[0].title, "테슬라 강남");
    assert_eq!(place.posts[0].rank, Some(1));
}

#[test]
fn ad_only_place_section_has_zero_posts() {
    let html = r#"<body>
      <div class="api_subject_bx"><h2>블로그</h2>
        <ul><li><a href="https://blog.naver.com/c/1">글</a></li></ul></div>
      <div id="place-main-section-root"><ul>
        <li class="ad_item"><a href="https://place.example.com/ad">광고</a></li>
      </ul></div></body>"#;
    let sections = parse_sections(html);
    assert_eq!(sections[0].kind, SectionKind::Place);
    assert!(sections[0].posts.is_empty());
    assert_eq!(sections.len(), 2);
}

#[test]
fn news_section_extracts_metadata() {
    let sections = parse_sections(SERP);
    let news = sections
        .iter()
        .find(|s| s.kind == SectionKind::News)
        .unwrap();
    assert_eq!(news.posts.len(), 3);
    let first = &news.posts[0];
    assert_eq!(first.rank, Some(1));
    assert_eq!(first.title, "현대차 전기차 판매 증가");
    assert_eq!(first.url, "https://n.news.naver.com/article/1");
    assert_eq!(first.summary.as_deref(), Some("현대차가 발표했다"));
    assert_eq!(first.publisher.as_deref(), Some("전자신문"));
    assert_eq!(first.relative_date.as_deref(), Some("3시간 전"));
    assert_eq!(news.posts[2].rank, Some(3));
}

#[test]
fn generic_box_dedupes_by_normalized_url_before_ranking() {
    let sections = parse_sections(SERP);
    let generic = sections
        .iter()
        .find(|s| s.kind == SectionKind::Generic("인기글".to_string()))
        .unwrap();
    assert_eq!(generic.posts.len(), 2);
    assert_eq!(generic.posts[0].summary.as_deref(), Some("한 달 타본 느낌"));
    assert_eq!(generic.posts[1].title, "아이오닉 충전 팁");
    assert_eq!(generic.posts[1].rank, Some(2));
}

#[test]
fn news_titled_generic_box_is_skipped() {
    let sections = parse_sections(SERP);
    assert!(!titles(&sections).iter().any(|t| t.contains("뉴스 모음")));
}

#[test]
fn review_section_keeps_only_content_hosts() {
    let sections = parse_sections(SERP);
    let review = sections
        .iter()
        .find(|s| s.kind == SectionKind::Review)
        .unwrap();
    assert_eq!(review.posts.len(), 1);
    assert_eq!(review.posts[0].url, "https://blog.naver.com/b/7");
    assert_eq!(review.posts[0].summary.as_deref(), Some("요약"));
}

#[test]
fn page_without_known_blocks_yields_nothing() {
    assert!(parse_sections("<html><body><p>no results</p></body></html>").is_empty());
}

#[test]
fn promote_place_section_moves_place_to_front() {
    let mut sections = vec![
        Section::new(SectionKind::News, vec![]),
        Section::new(SectionKind::Review, vec![]),
        Section::new(SectionKind::Place, vec![]),
    ];
    promote_place_section(&mut sections);
    assert_eq!(sections[0].kind, SectionKind::Place);
    assert_eq!(sections[1].kind, SectionKind::News);
}

#[test]
fn search_url_percent_encodes_keyword() {
    let url = search_url("https://search.example/?q={keyword}", "전기차 추천");
    assert!(url.starts_with("https://search.example/?q=%EC%A0%84"));
    assert!(!url.contains(' '));
}
