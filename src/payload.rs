// Raw backend payloads and their normalization into CommonResult.
//
// Each backend speaks its own shape. They are captured here as one tagged
// enum, and `normalize` maps every variant into the same result contract.
// Adding a backend means adding a variant, and the match below will not
// compile until it is handled.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::keywords::{KeywordExtractor, DEFAULT_TOP_N, LEGACY_TOP_N};
use crate::result::{
    round2, CommonResult, KeywordCount, LegacyVisionResult, MatchingPageSummary, Tag, VisualMatch,
};

/// `source` reported on every Cloud Vision match.
pub const CLOUD_VISION_SOURCE: &str = "Google Vision";
/// `source` reported on every scraped Lens match.
pub const SCRAPED_SOURCE: &str = "Google Lens (Scraped)";

pub const CLOUD_VISION_METHOD: &str = "Google Cloud Vision";
pub const AGGREGATOR_METHOD: &str = "SerpApi (Google Lens)";
pub const SCRAPED_METHOD: &str = "Scraped Google Lens";

/// How many aggregator matches feed keyword extraction. Wider than the
/// display cap so keyword relevance does not depend on it.
pub const AGGREGATOR_KEYWORD_POOL: usize = 50;

/// Link used when a scraped title has no enclosing anchor.
pub const PLACEHOLDER_LINK: &str = "#";

/// Number of scraped keywords promoted to best guesses.
const SCRAPED_BEST_GUESSES: usize = 2;

// --- Cloud Vision ---

#[derive(Debug, Clone, PartialEq)]
pub struct BestGuessLabel {
    pub label: String,
    /// Not every transport reports a confidence for best-guess labels.
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchingPage {
    pub page_title: String,
    pub url: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebEntity {
    pub description: String,
    pub score: f64,
}

/// Web-detection output of the cloud vision backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloudVisionPayload {
    pub best_guess_labels: Vec<BestGuessLabel>,
    pub pages_with_matching_images: Vec<MatchingPage>,
    pub web_entities: Vec<WebEntity>,
}

// --- Aggregator (SerpApi google_lens) ---
//
// SerpApi's shape drifts: fields go missing, turn null, or change type. Every
// field is read leniently, so one odd value costs that field (or that match),
// never the whole scan.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

impl KnowledgeGraph {
    /// None unless `value` is an object.
    fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            title: string_field(value, "title"),
            subtitle: string_field(value, "subtitle"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatorMatch {
    pub title: Option<String>,
    pub link: Option<String>,
    pub source: Option<String>,
    pub thumbnail: Option<String>,
}

impl AggregatorMatch {
    /// None unless `value` is an object; non-string fields read as absent.
    fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            title: string_field(value, "title"),
            link: string_field(value, "link"),
            source: string_field(value, "source"),
            thumbnail: string_field(value, "thumbnail"),
        })
    }
}

/// The parts of a SerpApi google_lens response the normalizer reads.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AggregatorPayload {
    #[serde(default, deserialize_with = "lenient_knowledge_graph")]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default, deserialize_with = "lenient_visual_matches")]
    pub visual_matches: Vec<AggregatorMatch>,
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// `knowledge_graph` has arrived both as an object and as a list of objects.
/// Take the object, or the first element of the list.
fn lenient_knowledge_graph<'de, D>(deserializer: D) -> Result<Option<KnowledgeGraph>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(list) => list.first().and_then(KnowledgeGraph::from_value),
        other => KnowledgeGraph::from_value(&other),
    })
}

/// Anything but a list reads as no matches; entries that are not objects are skipped.
fn lenient_visual_matches<'de, D>(deserializer: D) -> Result<Vec<AggregatorMatch>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(list) => list.iter().filter_map(AggregatorMatch::from_value).collect(),
        _ => Vec::new(),
    })
}

// --- Scraped Lens page ---

/// A title element found in the rendered Lens page.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPayload {
    pub fragments: Vec<Fragment>,
    /// The CSS selector that located the fragments.
    pub selector: String,
}

/// One backend's native output, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawUpstreamPayload {
    CloudVision(CloudVisionPayload),
    Aggregator(AggregatorPayload),
    Scraped(ScrapedPayload),
}

/// Map any backend payload into the common result.
pub fn normalize(payload: RawUpstreamPayload, extractor: &KeywordExtractor) -> CommonResult {
    match payload {
        RawUpstreamPayload::CloudVision(p) => normalize_cloud_vision(p, extractor),
        RawUpstreamPayload::Aggregator(p) => normalize_aggregator(p, extractor),
        RawUpstreamPayload::Scraped(p) => normalize_scraped(p, extractor),
    }
}

fn normalize_cloud_vision(payload: CloudVisionPayload, extractor: &KeywordExtractor) -> CommonResult {
    let best_guesses = payload
        .best_guess_labels
        .into_iter()
        .map(|l| l.label)
        .collect();

    let matches: Vec<VisualMatch> = payload
        .pages_with_matching_images
        .into_iter()
        .map(|page| VisualMatch {
            title: page.page_title,
            link: page.url,
            source: CLOUD_VISION_SOURCE.to_string(),
            thumbnail: None,
        })
        .collect();

    let keywords = keywords_for(&matches, matches.len(), extractor, DEFAULT_TOP_N);
    CommonResult::new(CLOUD_VISION_METHOD, best_guesses, matches, keywords)
}

fn normalize_aggregator(payload: AggregatorPayload, extractor: &KeywordExtractor) -> CommonResult {
    let best_guesses = payload
        .knowledge_graph
        .as_ref()
        .and_then(format_knowledge_graph)
        .into_iter()
        .collect();

    let matches: Vec<VisualMatch> = payload
        .visual_matches
        .into_iter()
        .map(|m| VisualMatch {
            title: m.title.unwrap_or_default(),
            link: m.link.unwrap_or_default(),
            source: m.source.unwrap_or_default(),
            thumbnail: m.thumbnail.filter(|t| !t.is_empty()),
        })
        .collect();

    let keywords = keywords_for(&matches, AGGREGATOR_KEYWORD_POOL, extractor, DEFAULT_TOP_N);
    CommonResult::new(AGGREGATOR_METHOD, best_guesses, matches, keywords)
}

fn normalize_scraped(payload: ScrapedPayload, extractor: &KeywordExtractor) -> CommonResult {
    let matches: Vec<VisualMatch> = payload
        .fragments
        .into_iter()
        .filter(|f| !f.title.is_empty())
        .map(|f| VisualMatch {
            title: f.title,
            link: f.link,
            source: SCRAPED_SOURCE.to_string(),
            thumbnail: None,
        })
        .collect();

    let keywords = keywords_for(&matches, matches.len(), extractor, DEFAULT_TOP_N);

    // Lens pages have no best-guess concept; promote the top keywords instead.
    let best_guesses = keywords
        .iter()
        .take(SCRAPED_BEST_GUESSES)
        .map(|k| k.word.clone())
        .collect();

    CommonResult::new(SCRAPED_METHOD, best_guesses, matches, keywords)
        .with_debug_info(format!("Selector used: {}", payload.selector))
}

/// Cloud Vision in the original single-backend response shape.
pub fn normalize_legacy_vision(
    payload: CloudVisionPayload,
    extractor: &KeywordExtractor,
) -> LegacyVisionResult {
    let best_guesses: Vec<String> = payload
        .best_guess_labels
        .iter()
        .map(|l| l.label.clone())
        .collect();

    let google_sees = payload
        .web_entities
        .iter()
        .map(|e| Tag {
            description: e.description.clone(),
            score: round2(e.score),
        })
        .collect();

    let matching_pages = payload
        .pages_with_matching_images
        .iter()
        .map(|p| MatchingPageSummary {
            url: p.url.clone(),
            page_title: p.page_title.clone(),
            score: p.score.map(round2).unwrap_or(0.0),
        })
        .collect();

    let titles: Vec<&str> = payload
        .pages_with_matching_images
        .iter()
        .map(|p| p.page_title.as_str())
        .filter(|t| !t.is_empty())
        .collect();

    LegacyVisionResult {
        success: true,
        best_guess: best_guesses.first().cloned(),
        best_guesses,
        google_sees,
        matching_pages,
        common_keywords: extractor.extract(&titles, LEGACY_TOP_N),
    }
}

/// `"{title} ({subtitle})"`, or just the title when there is no subtitle.
/// None when the knowledge graph has no title.
pub fn format_knowledge_graph(kg: &KnowledgeGraph) -> Option<String> {
    let title = kg.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
    match kg.subtitle.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(subtitle) => Some(format!("{title} ({subtitle})")),
        None => Some(title.to_string()),
    }
}

/// Keywords over the titles of the first `pool` matches (before the display cap).
fn keywords_for(
    matches: &[VisualMatch],
    pool: usize,
    extractor: &KeywordExtractor,
    top_n: usize,
) -> Vec<KeywordCount> {
    let titles: Vec<&str> = matches.iter().take(pool).map(|m| m.title.as_str()).collect();
    extractor.extract(&titles, top_n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str) -> MatchingPage {
        MatchingPage {
            page_title: title.to_string(),
            url: format!("https://example.com/{}", title.replace(' ', "-")),
            score: Some(0.5),
        }
    }

    #[test]
    fn cloud_vision_maps_pages_and_labels() {
        let payload = CloudVisionPayload {
            best_guess_labels: vec![BestGuessLabel {
                label: "charmander".into(),
                confidence: None,
            }],
            pages_with_matching_images: vec![page("Charmander Plush"), page("Charmander Card")],
            web_entities: vec![],
        };
        let result = normalize(
            RawUpstreamPayload::CloudVision(payload),
            &KeywordExtractor::default(),
        );
        assert_eq!(result.method, CLOUD_VISION_METHOD);
        assert_eq!(result.best_guesses, vec!["charmander"]);
        assert_eq!(result.visual_matches.len(), 2);
        assert!(result.visual_matches.iter().all(|m| m.source == CLOUD_VISION_SOURCE));
        assert!(result.visual_matches.iter().all(|m| m.thumbnail.is_none()));
        assert_eq!(result.common_keywords[0].word, "charmander");
        assert_eq!(result.common_keywords[0].count, 2);
    }

    #[test]
    fn knowledge_graph_with_subtitle() {
        let kg = KnowledgeGraph {
            title: Some("Charmander".into()),
            subtitle: Some("Pokémon".into()),
        };
        assert_eq!(format_knowledge_graph(&kg).as_deref(), Some("Charmander (Pokémon)"));
    }

    #[test]
    fn knowledge_graph_without_subtitle_has_no_parens() {
        let kg = KnowledgeGraph {
            title: Some("Charmander".into()),
            subtitle: Some(String::new()),
        };
        assert_eq!(format_knowledge_graph(&kg).as_deref(), Some("Charmander"));
    }

    #[test]
    fn knowledge_graph_without_title_is_skipped() {
        let kg = KnowledgeGraph {
            title: Some("  ".into()),
            subtitle: Some("Pokémon".into()),
        };
        assert!(format_knowledge_graph(&kg).is_none());
    }

    #[test]
    fn aggregator_payload_tolerates_missing_fields() {
        let json = serde_json::json!({
            "search_metadata": {"status": "Success"},
            "visual_matches": [
                {"title": "Charmander"},
                {"link": "https://example.com", "position": 2}
            ]
        });
        let payload: AggregatorPayload = serde_json::from_value(json).unwrap();
        assert!(payload.knowledge_graph.is_none());
        assert_eq!(payload.visual_matches.len(), 2);

        let result = normalize(
            RawUpstreamPayload::Aggregator(payload),
            &KeywordExtractor::default(),
        );
        assert_eq!(result.visual_matches[0].link, "");
        assert_eq!(result.visual_matches[1].title, "");
        assert!(result.best_guesses.is_empty());
    }

    #[test]
    fn aggregator_knowledge_graph_as_list() {
        let json = serde_json::json!({
            "knowledge_graph": [{"title": "Charmander", "subtitle": "Pokémon"}, {"title": "Other"}]
        });
        let payload: AggregatorPayload = serde_json::from_value(json).unwrap();
        assert_eq!(
            payload.knowledge_graph.and_then(|kg| kg.title).as_deref(),
            Some("Charmander")
        );
    }

    #[test]
    fn aggregator_payload_skips_drifted_fields() {
        let json = serde_json::json!({
            "knowledge_graph": {"title": 7, "subtitle": "Pokémon"},
            "visual_matches": [
                {"title": 5, "link": "https://a.example"},
                "not a match",
                null,
                {"title": "Charmander plush", "thumbnail": {"url": "x"}, "source": ["a"]}
            ]
        });
        let payload: AggregatorPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.visual_matches.len(), 2);

        let result = normalize(
            RawUpstreamPayload::Aggregator(payload),
            &KeywordExtractor::default(),
        );
        assert!(result.best_guesses.is_empty());
        assert_eq!(result.visual_matches[0].title, "");
        assert_eq!(result.visual_matches[0].link, "https://a.example");
        assert_eq!(result.visual_matches[1].title, "Charmander plush");
        assert_eq!(result.visual_matches[1].thumbnail, None);
        assert_eq!(result.visual_matches[1].source, "");
        assert_eq!(result.common_keywords[0].word, "charmander");
    }

    #[test]
    fn aggregator_null_fields_read_as_empty() {
        let json = serde_json::json!({ "knowledge_graph": null, "visual_matches": null });
        let payload: AggregatorPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload, AggregatorPayload::default());
    }

    #[test]
    fn scraped_best_guesses_are_top_two_keywords() {
        let payload = ScrapedPayload {
            fragments: vec![
                Fragment {
                    title: "Charmander Pokemon Plush".into(),
                    link: "https://a.example".into(),
                },
                Fragment {
                    title: "Charmander Pokemon".into(),
                    link: PLACEHOLDER_LINK.into(),
                },
                Fragment {
                    title: "Charmander Card".into(),
                    link: PLACEHOLDER_LINK.into(),
                },
            ],
            selector: ".Yt787".into(),
        };
        let result = normalize(RawUpstreamPayload::Scraped(payload), &KeywordExtractor::default());
        assert_eq!(result.best_guesses, vec!["charmander", "pokemon"]);
        assert_eq!(result.debug_info.as_deref(), Some("Selector used: .Yt787"));
        assert!(result.visual_matches.iter().all(|m| m.source == SCRAPED_SOURCE));
    }

    #[test]
    fn scraped_with_no_fragments_is_empty_success() {
        let result = normalize(
            RawUpstreamPayload::Scraped(ScrapedPayload::default()),
            &KeywordExtractor::default(),
        );
        assert!(result.success);
        assert!(result.best_guesses.is_empty());
        assert!(result.visual_matches.is_empty());
    }

    #[test]
    fn legacy_shape_surfaces_entities_and_ten_keywords() {
        let words = [
            "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
            "juliet", "kilo", "lima",
        ];
        let payload = CloudVisionPayload {
            best_guess_labels: vec![
                BestGuessLabel {
                    label: "charmander".into(),
                    confidence: Some(0.9),
                },
                BestGuessLabel {
                    label: "pokemon".into(),
                    confidence: None,
                },
            ],
            pages_with_matching_images: vec![MatchingPage {
                page_title: words.join(" "),
                url: "https://example.com".into(),
                score: None,
            }],
            web_entities: vec![WebEntity {
                description: "Charmander".into(),
                score: 0.87654,
            }],
        };
        let legacy = normalize_legacy_vision(payload, &KeywordExtractor::default());
        assert_eq!(legacy.best_guess.as_deref(), Some("charmander"));
        assert_eq!(legacy.google_sees[0].score, 0.88);
        assert_eq!(legacy.matching_pages[0].score, 0.0);
        assert_eq!(legacy.common_keywords.len(), LEGACY_TOP_N);
    }
}
