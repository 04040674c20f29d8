// Title-class calibration for scraped Lens pages.
//
// When the cached selector stops matching, look for text we know should be
// on the page (the probe) and see which CSS class wraps it most often. That
// class is almost certainly the result-title class.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info};

/// Elements that can directly wrap a result title.
const TITLE_TAGS: &[&str] = &["div", "span", "h3", "a"];

/// Find the most common class among elements whose own text contains `probe`
/// (case-insensitive). Ties go to the class seen first. None when the probe
/// is not on the page or no matching element has a class.
pub fn detect_title_class(document: &Html, probe: &str) -> Option<String> {
    let needle = probe.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u32)> = Vec::new();
    let mut text_hits = 0usize;

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        if !text.to_lowercase().contains(&needle) {
            continue;
        }
        text_hits += 1;

        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if !TITLE_TAGS.contains(&parent.value().name()) {
            continue;
        }

        for class in parent.value().classes() {
            match index.get(class) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(class, counts.len());
                    counts.push((class, 1));
                }
            }
        }
    }

    if text_hits == 0 {
        info!(probe, "Calibration probe text not found on page");
        return None;
    }

    let mut best: Option<(&str, u32)> = None;
    for &(class, count) in &counts {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((class, count)),
        }
    }

    debug!(probe, text_hits, candidates = counts.len(), best = ?best, "Calibration scan complete");
    best.map(|(class, _)| class.to_string())
}

/// A class selector for `class`, escaped per CSSOM `CSS.escape` so names such
/// as `2xl` or `md:flex` still parse. None if the result does not parse.
pub fn class_selector(class: &str) -> Option<String> {
    if class.is_empty() {
        return None;
    }

    let first = class.chars().next();
    let single = class.chars().nth(1).is_none();
    let mut escaped = String::with_capacity(class.len() + 4);

    for (i, c) in class.chars().enumerate() {
        match c {
            '\0' => escaped.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => escaped.push_str(&format!("\\{:x} ", c as u32)),
            '0'..='9' if i == 0 || (i == 1 && first == Some('-')) => {
                escaped.push_str(&format!("\\{:x} ", c as u32))
            }
            '-' if i == 0 && single => escaped.push_str("\\-"),
            c if !c.is_ascii() || c == '-' || c == '_' || c.is_ascii_alphanumeric() => {
                escaped.push(c)
            }
            c => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }

    let selector = format!(".{escaped}");
    let result = match Selector::parse(&selector) {
        Ok(_) => Some(selector.clone()),
        Err(e) => {
            debug!(class, selector = %selector, error = ?e, "Calibrated class does not form a valid selector");
            None
        }
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_majority_class() {
        let html = Html::parse_document(
            r#"<html><body>
                <div class="abc123">Charmander plush</div>
                <span class="xyz999">charmander card</span>
                <div class="abc123">CHARMANDER figure</div>
                <span class="xyz999">Charmander toy</span>
                <h3 class="abc123">Charmander</h3>
            </body></html>"#,
        );
        assert_eq!(detect_title_class(&html, "Charmander").as_deref(), Some("abc123"));
    }

    #[test]
    fn tie_goes_to_first_seen() {
        let html = Html::parse_document(
            r#"<div class="first">Pikachu</div><div class="second">Pikachu</div>"#,
        );
        assert_eq!(detect_title_class(&html, "pikachu").as_deref(), Some("first"));
    }

    #[test]
    fn ignores_non_title_tags() {
        let html = Html::parse_document(r#"<p class="para">Charmander</p><li class="item">Charmander</li>"#);
        assert!(detect_title_class(&html, "Charmander").is_none());
    }

    #[test]
    fn missing_probe_text_returns_none() {
        let html = Html::parse_document(r#"<div class="abc">Squirtle</div>"#);
        assert!(detect_title_class(&html, "Charmander").is_none());
    }

    #[test]
    fn plain_class_needs_no_escaping() {
        assert_eq!(class_selector("abc123").as_deref(), Some(".abc123"));
        assert_eq!(class_selector("").as_deref(), None);
    }

    #[test]
    fn awkward_classes_are_escaped_and_still_match() {
        let html = Html::parse_document(
            r#"<div class="2xl">a</div><div class="md:flex">b</div><div class="-1x">c</div>"#,
        );
        let cases = [
            ("2xl", r".\32 xl", "a"),
            ("md:flex", r".md\:flex", "b"),
            ("-1x", r".-\31 x", "c"),
        ];
        for (class, expected, text) in cases {
            let selector = class_selector(class).unwrap();
            assert_eq!(selector, expected);
            let parsed = Selector::parse(&selector).unwrap();
            let found: Vec<String> = html
                .select(&parsed)
                .map(|e| e.text().collect::<String>())
                .collect();
            assert_eq!(found, vec![text.to_string()], "class {class}");
        }
    }

    #[test]
    fn empty_probe_returns_none() {
        let html = Html::parse_document(r#"<div class="abc">Squirtle</div>"#);
        assert!(detect_title_class(&html, "  ").is_none());
    }
}
