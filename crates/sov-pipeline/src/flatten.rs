//! Turns crawled sections into the exposure rows a run measures.

use sov_core::{Section, PLACE_SECTION_TITLE};
use sov_db::NewExposure;

/// Header fragments that mark a map or place listing.
const PLACE_TITLE_FRAGMENTS: [&str; 2] = ["플레이스", "지도"];

fn is_place_title(title: &str) -> bool {
    let normalized = title.trim().to_lowercase();
    normalized == PLACE_SECTION_TITLE.to_lowercase()
        || PLACE_TITLE_FRAGMENTS.iter().any(|f| normalized.contains(f))
}

/// Flattens sections into exposures in page order, skipping place listings.
///
/// Positions are 1-based and continuous across sections.
#[must_use]
pub fn flatten_sections(sections: &[Section]) -> Vec<NewExposure> {
    let mut exposures = Vec::new();
    for section in sections {
        if is_place_title(&section.title) {
            tracing::debug!(
                section = %section.title,
                posts = section.posts.len(),
                "skipping place section"
            );
            continue;
        }
        for post in &section.posts {
            let position = i32::try_from(exposures.len() + 1).unwrap_or(i32::MAX);
            exposures.push(NewExposure {
                block_type: section.title.clone(),
                title: post.title.clone(),
                url: post.url.clone(),
                description: post.summary.clone(),
                position,
            });
        }
    }
    exposures
}
