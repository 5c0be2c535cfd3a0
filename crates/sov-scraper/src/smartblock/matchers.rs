//! Ordered section matchers for the search-results page.
//!
//! Each matcher inspects the parsed document and either claims one or more
//! blocks or skips. Claimed container nodes are recorded so later matchers do
//! not count the same block twice.

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use sov_core::{Post, Section, SectionKind};

use crate::text::{normalize_whitespace, selector, visible_text};
use crate::urls::{is_content_host, normalize_url};

const PLACE_CONTAINERS: &[&str] = &[
    "#place-main-section-root",
    "#loc-main-section-root",
    "section.sp_nplace",
    "[data-section=\"place\"]",
];
const PLACE_TITLE: &[&str] = &[".place_bluelink", ".YwYLL", ".TYaxT", ".tit"];

const NEWS_CONTAINERS: &[&str] = &[
    "section.sp_nnews",
    "div.group_news",
    "#news_root",
    "[data-section=\"news\"]",
];
const NEWS_ITEMS: &[&str] = &["li.bx", "li"];
const NEWS_TITLE: &[&str] = &["a.news_tit", "a.title_link", "a[href]"];
const NEWS_SUMMARY: &[&str] = &[".news_dsc", ".dsc_txt_wrap", ".api_txt_lines"];
const NEWS_PUBLISHER: &[&str] = &["a.info.press", ".press", ".info_group .info"];
const NEWS_DATE: &[&str] = &["span.info", ".sub_time", "time"];

const REVIEW_CONTAINERS: &[&str] = &[
    "section.sp_nreview",
    "#review_root",
    "div.review_area",
    "[data-section=\"review\"]",
];

const GENERIC_BOXES: &[&str] = &["div.api_subject_bx", "section.sc_new"];
const GENERIC_HEADER: &[&str] = &[".api_title", ".title_area h2", "h2", "h3"];
const ITEM_TITLE: &[&str] = &[".title_link", ".total_tit", ".tit", ".name"];
const ITEM_SUMMARY: &[&str] = &[".dsc_txt", ".api_txt_lines.dsc_txt", ".dsc_link", ".dsc"];

/// A section claimed by a matcher, with the document-order position of its
/// container.
pub struct MatchedSection {
    pub section: Section,
    pub position: usize,
}

pub trait SectionMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the sections this matcher claims, or nothing to skip.
    fn match_sections<'a>(
        &self,
        document: &'a Html,
        claimed: &mut Vec<ElementRef<'a>>,
    ) -> Vec<MatchedSection>;
}

/// Matchers in priority order: place, news, review, then generic boxes.
#[must_use]
pub fn default_matchers() -> Vec<Box<dyn SectionMatcher>> {
    vec![
        Box::new(PlaceMatcher),
        Box::new(NewsMatcher),
        Box::new(ReviewMatcher),
        Box::new(GenericMatcher),
    ]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn first_match<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| scope.select(&sel).next())
}

fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| {
            scope
                .select(&sel)
                .map(visible_text)
                .find(|text| !text.is_empty())
        })
}

fn find_container<'a>(
    document: &'a Html,
    containers: &[&str],
    claimed: &[ElementRef<'a>],
) -> Option<ElementRef<'a>> {
    containers
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| {
            document
                .select(&sel)
                .find(|el| !overlaps_claimed(*el, claimed))
        })
}

fn is_ancestor(ancestor: ElementRef<'_>, node: ElementRef<'_>) -> bool {
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a == ancestor)
}

/// `true` if `element` is, contains, or sits inside a claimed node.
fn overlaps_claimed(element: ElementRef<'_>, claimed: &[ElementRef<'_>]) -> bool {
    claimed
        .iter()
        .any(|c| *c == element || is_ancestor(*c, element) || is_ancestor(element, *c))
}

/// Pre-order index of `element` in the document.
pub(crate) fn document_position(document: &Html, element: ElementRef<'_>) -> usize {
    document
        .root_element()
        .descendants()
        .position(|n| ElementRef::wrap(n) == Some(element))
        .unwrap_or(usize::MAX)
}

/// Sponsored entries carry `data-ad*` attributes, an `ad` class token, or an
/// ad badge inside them.
fn is_ad(item: ElementRef<'_>) -> bool {
    let el = item.value();
    if el.attrs().any(|(name, _)| name == "data-ad" || name.starts_with("data-ad-")) {
        return true;
    }
    let ad_class = |token: &str| {
        let t = token.to_ascii_lowercase();
        t == "ad" || t.starts_with("ad_") || t.ends_with("_ad") || t.contains("_ad_")
    };
    if el.classes().any(ad_class) {
        return true;
    }
    first_match(item, &[".ad_badge", ".spnew_ad", ".link_ad", "[data-ad]"]).is_some()
}

fn href_of(anchor: ElementRef<'_>) -> Option<String> {
    anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| h.starts_with("http://") || h.starts_with("https://"))
        .map(str::to_string)
}

fn first_link(scope: ElementRef<'_>) -> Option<(ElementRef<'_>, String)> {
    let sel = selector("a[href]")?;
    scope
        .select(&sel)
        .find_map(|a| href_of(a).map(|href| (a, href)))
}

fn items_of<'a>(container: ElementRef<'a>, item_selectors: &[&str]) -> Vec<ElementRef<'a>> {
    item_selectors
        .iter()
        .filter_map(|css| selector(css))
        .map(|sel| container.select(&sel).collect::<Vec<_>>())
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}

fn assign_ranks(posts: &mut [Post]) {
    for (i, post) in posts.iter_mut().enumerate() {
        post.rank = u32::try_from(i + 1).ok();
    }
}

fn dedupe_by_url(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|p| seen.insert(normalize_url(&p.url)))
        .collect()
}

fn plain_post(title: String, url: String, summary: Option<String>) -> Post {
    Post {
        rank: None,
        title,
        url,
        summary,
        is_ad: false,
        publisher: None,
        relative_date: None,
    }
}

// ---------------------------------------------------------------------------
// Place
// ---------------------------------------------------------------------------

/// Map/place listings. Sponsored entries are dropped before ranking.
pub struct PlaceMatcher;

impl SectionMatcher for PlaceMatcher {
    fn name(&self) -> &'static str {
        "place"
    }

    fn match_sections<'a>(
        &self,
        document: &'a Html,
        claimed: &mut Vec<ElementRef<'a>>,
    ) -> Vec<MatchedSection> {
        let Some(container) = find_container(document, PLACE_CONTAINERS, claimed) else {
            return Vec::new();
        };

        let mut posts: Vec<Post> = items_of(container, &["li"])
            .into_iter()
            .filter(|item| !is_ad(*item))
            .filter_map(|item| {
                let (anchor, url) = first_link(item)?;
                let title = first_text(item, PLACE_TITLE)
                    .unwrap_or_else(|| visible_text(anchor));
                if title.is_empty() {
                    return None;
                }
                Some(plain_post(title, url, None))
            })
            .collect();
        assign_ranks(&mut posts);

        claimed.push(container);
        vec![MatchedSection {
            section: Section::new(SectionKind::Place, posts),
            position: document_position(document, container),
        }]
    }
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

pub struct NewsMatcher;

impl SectionMatcher for NewsMatcher {
    fn name(&self) -> &'static str {
        "news"
    }

    fn match_sections<'a>(
        &self,
        document: &'a Html,
        claimed: &mut Vec<ElementRef<'a>>,
    ) -> Vec<MatchedSection> {
        let Some(container) = find_container(document, NEWS_CONTAINERS, claimed) else {
            return Vec::new();
        };

        let mut posts: Vec<Post> = items_of(container, NEWS_ITEMS)
            .into_iter()
            .filter_map(|item| {
                let anchor = first_match(item, NEWS_TITLE)?;
                let url = href_of(anchor)?;
                let title = visible_text(anchor);
                if title.is_empty() {
                    return None;
                }
                let publisher = first_text(item, NEWS_PUBLISHER);
                let relative_date = first_text(item, NEWS_DATE)
                    .filter(|d| publisher.as_deref() != Some(d.as_str()));
                Some(Post {
                    rank: None,
                    title,
                    url,
                    summary: first_text(item, NEWS_SUMMARY),
                    is_ad: is_ad(item),
                    publisher,
                    relative_date,
                })
            })
            .collect();
        posts = dedupe_by_url(posts);
        assign_ranks(&mut posts);

        claimed.push(container);
        vec![MatchedSection {
            section: Section::new(SectionKind::News, posts),
            position: document_position(document, container),
        }]
    }
}

// ---------------------------------------------------------------------------
// Review / UGC
// ---------------------------------------------------------------------------

/// Blog and cafe reviews. Only links into content hosts count.
pub struct ReviewMatcher;

impl SectionMatcher for ReviewMatcher {
    fn name(&self) -> &'static str {
        "review"
    }

    fn match_sections<'a>(
        &self,
        document: &'a Html,
        claimed: &mut Vec<ElementRef<'a>>,
    ) -> Vec<MatchedSection> {
        let Some(container) = find_container(document, REVIEW_CONTAINERS, claimed) else {
            return Vec::new();
        };
        let Some(anchor_sel) = selector("a[href]") else {
            return Vec::new();
        };

        let items = items_of(container, &["li"]);
        let scopes = if items.is_empty() { vec![container] } else { items };

        let mut posts = Vec::new();
        for scope in scopes {
            let title_anchor = first_match(scope, ITEM_TITLE)
                .filter(|el| el.value().name() == "a")
                .and_then(|a| href_of(a).map(|href| (a, href)))
                .filter(|(_, href)| is_content_host(href));
            let candidates: Vec<(ElementRef<'_>, String)> = match title_anchor {
                Some(found) => vec![found],
                None => scope
                    .select(&anchor_sel)
                    .filter_map(|a| href_of(a).map(|href| (a, href)))
                    .filter(|(_, href)| is_content_host(href))
                    .collect(),
            };
            for (anchor, url) in candidates {
                let title = visible_text(anchor);
                if title.is_empty() {
                    continue;
                }
                let summary = if scope == container {
                    None
                } else {
                    first_text(scope, ITEM_SUMMARY)
                };
                posts.push(plain_post(title, url, summary));
            }
        }
        let mut posts = dedupe_by_url(posts);
        assign_ranks(&mut posts);

        claimed.push(container);
        vec![MatchedSection {
            section: Section::new(SectionKind::Review, posts),
            position: document_position(document, container),
        }]
    }
}

// ---------------------------------------------------------------------------
// Generic subject boxes
// ---------------------------------------------------------------------------

/// Remaining header-plus-list boxes. News-titled boxes are skipped so news is
/// never counted twice.
pub struct GenericMatcher;

fn is_news_header(header: &str) -> bool {
    header.contains("뉴스") || header.to_lowercase().contains("news")
}

impl SectionMatcher for GenericMatcher {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn match_sections<'a>(
        &self,
        document: &'a Html,
        claimed: &mut Vec<ElementRef<'a>>,
    ) -> Vec<MatchedSection> {
        let boxes: Vec<ElementRef<'_>> = GENERIC_BOXES
            .iter()
            .filter_map(|css| selector(css))
            .flat_map(|sel| document.select(&sel).collect::<Vec<_>>())
            .collect();

        let mut out = Vec::new();
        for bx in boxes {
            if overlaps_claimed(bx, claimed) {
                continue;
            }
            let Some(header) = first_text(bx, GENERIC_HEADER).map(|h| normalize_whitespace(&h))
            else {
                continue;
            };
            if is_news_header(&header) {
                tracing::debug!(header = %header, "skipping news-titled generic box");
                continue;
            }

            let posts: Vec<Post> = items_of(bx, &["li"])
                .into_iter()
                .filter_map(|item| {
                    let (anchor, url) = first_match(item, ITEM_TITLE)
                        .filter(|el| el.value().name() == "a")
                        .and_then(|a| href_of(a).map(|href| (a, href)))
                        .or_else(|| first_link(item))?;
                    let title = visible_text(anchor);
                    if title.is_empty() {
                        return None;
                    }
                    let mut post = plain_post(title, url, first_text(item, ITEM_SUMMARY));
                    post.is_ad = is_ad(item);
                    Some(post)
                })
                .collect();
            let mut posts = dedupe_by_url(posts);
            if posts.is_empty() {
                continue;
            }
            assign_ranks(&mut posts);

            claimed.push(bx);
            out.push(MatchedSection {
                section: Section::new(SectionKind::Generic(header), posts),
                position: document_position(document, bx),
            });
        }
        out
    }
}
