use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Section title assigned to place/map listings. Flattening skips it.
pub const PLACE_SECTION_TITLE: &str = "Place";

/// Lifecycle of one analysis run. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Crawling,
    Extracting,
    Analyzing,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Crawling => "crawling",
            RunStatus::Extracting => "extracting",
            RunStatus::Analyzing => "analyzing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Position in the forward-only ordering. Terminal states share the last rank.
    fn rank(self) -> u8 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Crawling => 1,
            RunStatus::Extracting => 2,
            RunStatus::Analyzing => 3,
            RunStatus::Completed | RunStatus::Failed => 4,
        }
    }

    /// Returns `true` if moving from `self` to `next` respects the
    /// forward-only state machine.
    ///
    /// Any non-terminal state may fail. `crawling` may jump straight to
    /// `completed` when the crawl produced no qualifying exposures.
    #[must_use]
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == RunStatus::Failed {
            return true;
        }
        if self == RunStatus::Crawling && next == RunStatus::Completed {
            return true;
        }
        next.rank() == self.rank() + 1
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "crawling" => Ok(RunStatus::Crawling),
            "extracting" => Ok(RunStatus::Extracting),
            "analyzing" => Ok(RunStatus::Analyzing),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(CoreError::UnknownVariant {
                kind: "run status",
                value: other.to_string(),
            }),
        }
    }
}

/// Outcome of the content-extraction stage for one exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Success,
    SuccessOcr,
    SuccessMetadata,
    SuccessApi,
    Failed,
}

impl ExtractionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::Success => "success",
            ExtractionStatus::SuccessOcr => "success_ocr",
            ExtractionStatus::SuccessMetadata => "success_metadata",
            ExtractionStatus::SuccessApi => "success_api",
            ExtractionStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ExtractionStatus::Success
                | ExtractionStatus::SuccessOcr
                | ExtractionStatus::SuccessMetadata
                | ExtractionStatus::SuccessApi
        )
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExtractionStatus::Pending),
            "success" => Ok(ExtractionStatus::Success),
            "success_ocr" => Ok(ExtractionStatus::SuccessOcr),
            "success_metadata" => Ok(ExtractionStatus::SuccessMetadata),
            "success_api" => Ok(ExtractionStatus::SuccessApi),
            "failed" => Ok(ExtractionStatus::Failed),
            other => Err(CoreError::UnknownVariant {
                kind: "extraction status",
                value: other.to_string(),
            }),
        }
    }
}

/// Rendering family of a linked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    Blog,
    View,
    News,
    Other,
}

impl UrlType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UrlType::Blog => "blog",
            UrlType::View => "view",
            UrlType::News => "news",
            UrlType::Other => "other",
        }
    }

    /// Blog and cafe/post pages are image-heavy and worth an OCR attempt.
    #[must_use]
    pub fn is_ocr_eligible(self) -> bool {
        matches!(self, UrlType::Blog | UrlType::View)
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which matcher claimed a section of the results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "header", rename_all = "lowercase")]
pub enum SectionKind {
    Place,
    News,
    Review,
    Generic(String),
}

impl SectionKind {
    /// Display title used as the exposure block type downstream.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            SectionKind::Place => PLACE_SECTION_TITLE.to_string(),
            SectionKind::News => "News".to_string(),
            SectionKind::Review => "VIEW".to_string(),
            SectionKind::Generic(header) => header.clone(),
        }
    }
}

/// One ranked item inside a results-page section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// 1-based rank within the section; `None` when the section is unranked.
    pub rank: Option<u32>,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub is_ad: bool,
    pub publisher: Option<String>,
    pub relative_date: Option<String>,
}

/// A named block of the results page and its posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub kind: SectionKind,
    pub posts: Vec<Post>,
}

impl Section {
    #[must_use]
    pub fn new(kind: SectionKind, posts: Vec<Post>) -> Self {
        Self {
            title: kind.title(),
            kind,
            posts,
        }
    }
}
