//! Hashtag extraction for image descriptions.
//!
//! # Invariants
//! - Extracted tags are lowercase and never carry the `#` marker.
//! - Order follows first occurrence in the source text; duplicates are kept.

use once_cell::sync::Lazy;
use regex::Regex;

static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));

/// Extracts lowercase hashtags from free text.
///
/// A doubled marker (`##word`) yields `word`. Absent text yields no tags.
///
/// ```
/// use picter_core::extract_tags;
///
/// assert_eq!(extract_tags("a #Pic with ##Good"), vec!["pic", "good"]);
/// assert!(extract_tags(None).is_empty());
/// ```
pub fn extract_tags<'a>(text: impl Into<Option<&'a str>>) -> Vec<String> {
    let Some(text) = text.into() else {
        return Vec::new();
    };

    HASHTAG_RE
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|token| token.as_str().to_lowercase())
        .collect()
}

/// Normalizes a query tag into the stored token form.
///
/// Strips every `#` marker, trims whitespace and lowercases, so `"#Family"`
/// and `" family "` both look up `family`.
pub fn normalize_tag(tag: &str) -> String {
    tag.replace('#', "").trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{extract_tags, normalize_tag};

    #[test]
    fn extracts_tags_in_order_and_lowercase() {
        let tags = extract_tags("a #picture with tags #photogram #ava20 ##Good");
        assert_eq!(tags, vec!["picture", "photogram", "ava20", "good"]);
    }

    #[test]
    fn text_without_hashtags_yields_nothing() {
        assert!(extract_tags("no tags aaah").is_empty());
        assert!(extract_tags("").is_empty());
        assert!(extract_tags("#").is_empty());
        assert!(extract_tags("## #").is_empty());
    }

    #[test]
    fn absent_text_yields_nothing() {
        assert!(extract_tags(None).is_empty());
    }

    #[test]
    fn duplicates_are_preserved() {
        let tags = extract_tags("#Sun and more #sun at the #beach");
        assert_eq!(tags, vec!["sun", "sun", "beach"]);
    }

    #[test]
    fn punctuation_ends_a_tag() {
        let tags = extract_tags("Disfrutando en #holidays, con #family. es #awesome!");
        assert_eq!(tags, vec!["holidays", "family", "awesome"]);
    }

    #[test]
    fn normalize_tag_matches_extracted_form() {
        assert_eq!(normalize_tag("#Family"), "family");
        assert_eq!(normalize_tag("  ##HOLIDAYS "), "holidays");
        assert_eq!(normalize_tag("awesome"), "awesome");
    }
}
