//! Text normalization for slide candidates.
//!
//! Slide text is normalized before it is shown to the match provider,
//! compared against placeholder markers, or scored for similarity.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple whitespace characters into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Upper bound on candidate text handed to the match provider, in characters.
pub const MAX_CANDIDATE_CHARS: usize = 2000;

/// Normalize a string for comparison purposes.
///
/// Applies NFC, converts to lowercase, removes punctuation, and collapses
/// whitespace.
pub fn normalize_for_comparison(text: &str) -> String {
    text.nfc()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Calculate similarity between two normalized strings.
///
/// Returns a score from 0.0 (completely different) to 1.0 (exact match).
/// Uses a combination of exact match, whole-word containment, and word
/// overlap.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Exact match
    if a == b {
        return 1.0;
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    // Every word of the shorter side appears in the longer one
    let (shorter, longer) = if words_a.len() <= words_b.len() {
        (&words_a, &words_b)
    } else {
        (&words_b, &words_a)
    };
    if shorter.is_subset(longer) {
        return 0.5 + 0.5 * (shorter.len() as f64 / longer.len() as f64);
    }

    // Word overlap (Jaccard similarity)
    let intersection = words_a.intersection(&words_b).count() as f64;
    let union = words_a.union(&words_b).count() as f64;

    intersection / union
}

/// Text normalizer for slide candidate text.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Whether to preserve original line breaks.
    preserve_line_breaks: bool,
    /// Maximum characters kept by [`TextNormalizer::candidate_text`].
    max_chars: usize,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    /// Create a new text normalizer with default settings.
    pub fn new() -> Self {
        Self {
            preserve_line_breaks: true,
            max_chars: MAX_CANDIDATE_CHARS,
        }
    }

    /// Set whether to preserve original line breaks.
    pub fn with_preserve_line_breaks(mut self, preserve: bool) -> Self {
        self.preserve_line_breaks = preserve;
        self
    }

    /// Set the candidate text limit.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Normalize a block of text.
    ///
    /// - Applies Unicode NFC
    /// - Normalizes line endings to `\n`
    /// - Collapses whitespace runs to single spaces
    /// - Drops blank lines and trims each line
    pub fn normalize(&self, text: &str) -> String {
        let text: String = text.nfc().collect();
        let text = text.replace("\r\n", "\n").replace('\r', "\n");

        let lines = text
            .lines()
            .map(|line| WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty());

        if self.preserve_line_breaks {
            lines.collect::<Vec<_>>().join("\n")
        } else {
            lines.collect::<Vec<_>>().join(" ")
        }
    }

    /// Normalize text and cut it to the candidate limit on a char boundary.
    pub fn candidate_text(&self, text: &str) -> String {
        let normalized = self.normalize(text);
        match normalized.char_indices().nth(self.max_chars) {
            Some((cut, _)) => normalized[..cut].to_string(),
            None => normalized,
        }
    }

    /// Whether `text` contains any of the given placeholder markers.
    ///
    /// Matching is case-insensitive and ignores punctuation and spacing.
    pub fn contains_marker(&self, text: &str, markers: &[String]) -> bool {
        let haystack = normalize_for_comparison(text);
        if haystack.is_empty() {
            return false;
        }
        markers
            .iter()
            .map(|m| normalize_for_comparison(m))
            .filter(|m| !m.is_empty())
            .any(|m| haystack.contains(&m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        let normalizer = TextNormalizer::new();

        assert_eq!(normalizer.normalize("Hello    world"), "Hello world");
        assert_eq!(normalizer.normalize("  Hello  "), "Hello");
        assert_eq!(normalizer.normalize("\t\tHello\t\t"), "Hello");
    }

    #[test]
    fn test_preserve_line_breaks() {
        let normalizer = TextNormalizer::new().with_preserve_line_breaks(true);

        assert_eq!(
            normalizer.normalize("Line one\r\nLine two"),
            "Line one\nLine two"
        );
        assert_eq!(normalizer.normalize("Line one\n\n\nLine two"), "Line one\nLine two");
    }

    #[test]
    fn test_join_lines_when_not_preserving() {
        let normalizer = TextNormalizer::new().with_preserve_line_breaks(false);
        assert_eq!(normalizer.normalize("Line one\nLine two"), "Line one Line two");
    }

    #[test]
    fn test_nfc_composition() {
        let normalizer = TextNormalizer::new();
        // "e" + combining acute composes to a single char
        assert_eq!(normalizer.normalize("Caf\u{65}\u{301}"), "Caf\u{e9}");
    }

    #[test]
    fn test_candidate_text_truncates_on_char_boundary() {
        let normalizer = TextNormalizer::new().with_max_chars(3);
        assert_eq!(normalizer.candidate_text("ééééé"), "ééé");
        assert_eq!(normalizer.candidate_text("ab"), "ab");
    }

    #[test]
    fn test_contains_marker() {
        let normalizer = TextNormalizer::new();
        let markers = vec!["Click to add text".to_string(), "Lorem ipsum".to_string()];

        assert!(normalizer.contains_marker("CLICK TO ADD TEXT", &markers));
        assert!(normalizer.contains_marker("lorem  ipsum, dolor sit amet", &markers));
        assert!(!normalizer.contains_marker("Project timeline", &markers));
        assert!(!normalizer.contains_marker("", &markers));
    }

    #[test]
    fn test_normalize_for_comparison() {
        assert_eq!(normalize_for_comparison("Project Timeline!"), "project timeline");
        assert_eq!(
            normalize_for_comparison("  Budget   and  Costs  "),
            "budget and costs"
        );
        assert_eq!(normalize_for_comparison("It's Done"), "its done");
    }

    #[test]
    fn test_calculate_similarity() {
        // Exact match
        assert_eq!(calculate_similarity("timeline", "timeline"), 1.0);

        // Keyword contained in longer text
        let sim = calculate_similarity("timeline", "project timeline and phases");
        assert!(sim > 0.5 && sim < 1.0);

        // Same words, different order
        assert_eq!(calculate_similarity("q3 budget", "budget q3"), 1.0);

        // Partial overlap
        let sim = calculate_similarity("project budget", "project timeline");
        assert!(sim > 0.0 && sim < 0.5);

        // No overlap
        assert_eq!(calculate_similarity("budget", "team photo"), 0.0);
        assert_eq!(calculate_similarity("", "team photo"), 0.0);
    }
}
