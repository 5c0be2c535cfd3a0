use std::collections::HashSet;

use crate::CoreError;

/// Maximum number of brands compared in one run.
pub const MAX_BRANDS: usize = 10;

/// Trim a market keyword, rejecting blank input.
///
/// # Errors
///
/// Returns [`CoreError::EmptyKeyword`] if the keyword is empty after trimming.
pub fn normalize_keyword(keyword: &str) -> Result<String, CoreError> {
    let trimmed = keyword.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyKeyword);
    }
    Ok(trimmed.to_string())
}

/// Validate and clean the brand list for a new run.
///
/// Names are trimmed, blanks dropped, and case-insensitive duplicates removed
/// while preserving first-seen order. The cleaned list must hold between 1 and
/// [`MAX_BRANDS`] names.
///
/// # Errors
///
/// Returns [`CoreError::BrandCount`] if the cleaned list is empty or too long.
pub fn normalize_brands<S: AsRef<str>>(brands: &[S]) -> Result<Vec<String>, CoreError> {
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = brands
        .iter()
        .map(|b| b.as_ref().trim())
        .filter(|b| !b.is_empty())
        .filter(|b| seen.insert(b.to_lowercase()))
        .map(str::to_string)
        .collect();

    if cleaned.is_empty() || cleaned.len() > MAX_BRANDS {
        return Err(CoreError::BrandCount {
            got: cleaned.len(),
            max: MAX_BRANDS,
        });
    }
    Ok(cleaned)
}

/// Literal brand-mention test shared by the scorer and the metadata fallback.
///
/// Matches a case-insensitive substring, or the same comparison after
/// keeping only letters and digits on both sides (so `"Hyun dai"`,
/// `"hyundai!"` or `"현대・자동차"` still match).
#[must_use]
pub fn literal_brand_match(content: &str, brand: &str) -> bool {
    let brand_lower = brand.trim().to_lowercase();
    if brand_lower.is_empty() {
        return false;
    }
    let content_lower = content.to_lowercase();
    if content_lower.contains(&brand_lower) {
        return true;
    }

    let squash = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .collect()
    };
    let brand_squashed = squash(&brand_lower);
    !brand_squashed.is_empty() && squash(&content_lower).contains(&brand_squashed)
}
