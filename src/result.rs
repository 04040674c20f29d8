// The common result contract every backend is normalized into.
//
// Field names serialize in snake_case so the JSON matches what existing
// clients of the /scan endpoint already read.

use serde::{Deserialize, Serialize};

/// Maximum number of visual matches shown to the caller.
pub const MAX_VISUAL_MATCHES: usize = 10;

/// A single page or image that visually matches the submitted photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualMatch {
    pub title: String,
    pub link: String,
    /// Site or backend that produced the match.
    pub source: String,
    /// Only the aggregator backend returns thumbnails.
    pub thumbnail: Option<String>,
}

/// A keyword and how many times it appeared across the title pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: u32,
}

/// Backend-agnostic scan result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonResult {
    pub success: bool,
    /// Display name of the backend that produced this result.
    pub method: String,
    pub best_guesses: Vec<String>,
    pub visual_matches: Vec<VisualMatch>,
    pub common_keywords: Vec<KeywordCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
}

impl CommonResult {
    /// Build a successful result, capping the display matches.
    ///
    /// Keywords must already be computed from the full title pool; the cap
    /// only applies to what is shown.
    pub fn new(
        method: &str,
        best_guesses: Vec<String>,
        mut visual_matches: Vec<VisualMatch>,
        common_keywords: Vec<KeywordCount>,
    ) -> Self {
        visual_matches.truncate(MAX_VISUAL_MATCHES);
        Self {
            success: true,
            method: method.to_string(),
            best_guesses,
            visual_matches,
            common_keywords,
            debug_info: None,
        }
    }

    /// Successful result with nothing found. Used by best-effort backends.
    pub fn empty(method: &str) -> Self {
        Self::new(method, Vec::new(), Vec::new(), Vec::new())
    }

    pub fn with_debug_info(mut self, info: impl Into<String>) -> Self {
        self.debug_info = Some(info.into());
        self
    }
}

/// A raw web entity surfaced by the legacy single-backend shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub description: String,
    pub score: f64,
}

/// A matching page as surfaced by the legacy single-backend shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingPageSummary {
    pub url: String,
    pub page_title: String,
    pub score: f64,
}

/// The original single-backend (Cloud Vision only) response shape.
///
/// Kept for clients that still read `google_sees` and `matching_pages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyVisionResult {
    pub success: bool,
    pub best_guesses: Vec<String>,
    /// The top-ranked best-guess label, if any.
    pub best_guess: Option<String>,
    pub google_sees: Vec<Tag>,
    pub matching_pages: Vec<MatchingPageSummary>,
    pub common_keywords: Vec<KeywordCount>,
}

/// Round a confidence score to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
