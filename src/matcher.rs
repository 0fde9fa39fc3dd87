//! Stand-alone text-fragment matching over a [`Document`].
//!
//! The matcher lets the factory decide when a candidate is safe to stop
//! expanding. It is deterministic for a given document and descriptor, and
//! follows native matching closely enough for that purpose: every
//! `textStart` occurrence is tried, `textEnd` must begin at or after the end
//! of `textStart`, and context must sit inside a short window next to the match.

use crate::document::{Document, DocumentRange, next_char_boundary};
use crate::encoder::{FragmentParts, decode_component};
use crate::normalize;
use crate::types::{FragmentMatch, ValidationResult};

/// Extra characters allowed between a prefix or suffix and the match.
const CONTEXT_SLACK: usize = 50;

/// A decoded, normalized, folded directive part with its char length.
struct Needle {
    /// Length of `text` in chars.
    chars: usize,
    /// Search text.
    text: String,
}

impl Needle {
    /// Decode and normalize one encoded part. `None` for absent or blank parts.
    fn from_part(part: Option<&str>) -> Option<Self> {
        let text = normalize::fold(&normalize::normalize(&decode_component(part?)));
        if text.is_empty() {
            return None;
        }
        return Some(Self {
            chars: text.chars().count(),
            text,
        });
    }
}

/// Every place in `document` that `parts` resolves to, in document order.
/// Matches whose offsets cannot be mapped back onto text leaves are dropped.
pub fn find_matches(document: &Document, parts: &FragmentParts) -> Vec<FragmentMatch> {
    let Some(start) = Needle::from_part(Some(&parts.text_start)) else {
        return Vec::new();
    };
    let end = Needle::from_part(parts.text_end.as_deref());
    let prefix = Needle::from_part(parts.prefix.as_deref());
    let suffix = Needle::from_part(parts.suffix.as_deref());

    let searchable = document.searchable();
    let haystack = searchable.as_str();
    let mut matches = Vec::new();
    let mut from = 0_usize;

    while let Some(found) = haystack.get(from..).and_then(|rest| return rest.find(&start.text)) {
        let start_byte = from.saturating_add(found);
        from = next_char_boundary(haystack, start_byte);
        let mut end_byte = start_byte.saturating_add(start.text.len());

        if let Some(end) = &end {
            let Some(offset) = haystack.get(end_byte..).and_then(|rest| return rest.find(&end.text)) else {
                // No later start can have a textEnd either.
                break;
            };
            end_byte = end_byte.saturating_add(offset).saturating_add(end.text.len());
        }

        let (Some(start_char), Some(end_char)) = (searchable.char_index(start_byte), searchable.char_index(end_byte))
        else {
            continue;
        };

        if let Some(prefix) = &prefix {
            let window_start = searchable.byte_at(start_char.saturating_sub(prefix.chars.saturating_add(CONTEXT_SLACK)));
            let before = haystack.get(window_start..start_byte).unwrap_or_default();
            if !before.contains(&prefix.text) {
                continue;
            }
        }
        if let Some(suffix) = &suffix {
            let window_end = searchable.byte_at(end_char.saturating_add(suffix.chars).saturating_add(CONTEXT_SLACK));
            let after = haystack.get(end_byte..window_end).unwrap_or_default();
            if !after.contains(&suffix.text) {
                continue;
            }
        }

        let Some((raw_start, raw_end)) = searchable.raw_span(start_char, end_char) else {
            continue;
        };
        let Some(range) = document.range_from_offsets(raw_start, raw_end) else {
            tracing::debug!(raw_start, raw_end, "dropping match outside text leaves");
            continue;
        };
        matches.push(FragmentMatch {
            range,
            text: document.text_between(raw_start, raw_end),
        });
    }

    return matches;
}

/// Whether two ranges share at least one character, in document order.
/// Ranges that cannot be placed in the document never overlap.
pub fn ranges_overlap(document: &Document, a: &DocumentRange, b: &DocumentRange) -> bool {
    let (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) = (
        document.position(a.start),
        document.position(a.end),
        document.position(b.start),
        document.position(b.end),
    ) else {
        return false;
    };
    return a_start < b_end && b_start < a_end;
}

/// Count the matches of `parts` and check whether any overlaps `expected`.
pub fn validate(document: &Document, parts: &FragmentParts, expected: &DocumentRange) -> ValidationResult {
    let matches = find_matches(document, parts);
    return ValidationResult {
        is_unique: matches.len() == 1,
        match_count: matches.len(),
        matches_selection: matches.iter().any(|m| return ranges_overlap(document, &m.range, expected)),
    };
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::document::DocumentBuilder;
    use crate::encoder::encode_component;

    fn doc(html: &str) -> Document {
        Document::parse_html(html).unwrap()
    }

    fn parts(start: &str, end: Option<&str>, prefix: Option<&str>, suffix: Option<&str>) -> FragmentParts {
        FragmentParts {
            prefix: prefix.map(encode_component),
            suffix: suffix.map(encode_component),
            text_end: end.map(encode_component),
            text_start: encode_component(start),
        }
    }

    #[test]
    fn finds_every_occurrence_including_overlapping_ones() {
        let d = doc("<p>aaaa</p>");
        assert_eq!(find_matches(&d, &parts("aa", None, None, None)).len(), 3);
    }

    #[test]
    fn matches_are_case_and_whitespace_insensitive() {
        let d = doc("<p>The   Quick\nbrown fox</p>");
        let found = find_matches(&d, &parts("quick BROWN", None, None, None));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "Quick\nbrown");
    }

    #[test]
    fn range_match_spans_from_start_to_end() {
        let d = doc("<p>one two three four five</p>");
        let found = find_matches(&d, &parts("two", Some("four"), None, None));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "two three four");
    }

    #[test]
    fn text_end_must_follow_text_start() {
        let d = doc("<p>end comes before start</p>");
        assert!(find_matches(&d, &parts("start", Some("end"), None, None)).is_empty());
    }

    #[test]
    fn prefix_and_suffix_disambiguate() {
        let d = doc("<p>red apple and green apple</p>");
        assert_eq!(find_matches(&d, &parts("apple", None, None, None)).len(), 2);
        let found = find_matches(&d, &parts("apple", None, Some("green"), None));
        assert_eq!(found.len(), 1);
        assert_eq!(d.absolute_range(&found[0].range), Some((20, 25)));
        assert_eq!(find_matches(&d, &parts("red", None, None, Some("apple"))).len(), 1);
    }

    #[test]
    fn prefix_outside_window_is_ignored() {
        let filler = "x ".repeat(40);
        let d = doc(&format!("<p>marker {filler}target</p>"));
        assert!(find_matches(&d, &parts("target", None, Some("marker"), None)).is_empty());
    }

    #[test]
    fn matches_across_block_boundaries() {
        let d = doc("<h2>Title</h2><p>Body text</p>");
        let found = find_matches(&d, &parts("title body", None, None, None));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "Title\nBody");
    }

    #[test]
    fn hidden_text_never_matches() {
        let d = doc("<p>visible</p><script>secret</script><div hidden>secret</div>");
        assert!(find_matches(&d, &parts("secret", None, None, None)).is_empty());
    }

    #[test]
    fn validate_reports_overlap_not_equality() {
        let d = doc("<p>alpha beta gamma delta</p>");
        let selection = d.find_quote("beta gamma", 1).unwrap();
        let widened = validate(&d, &parts("alpha beta", None, None, None), &selection);
        assert_eq!(widened, ValidationResult { is_unique: true, match_count: 1, matches_selection: true });
        let before = validate(&d, &parts("alpha", None, None, None), &selection);
        assert!(before.is_unique && !before.matches_selection);
        let after = validate(&d, &parts("delta", None, None, None), &selection);
        assert!(!after.matches_selection);
    }

    #[test]
    fn adjacent_leaves_do_not_overlap() {
        let mut b = DocumentBuilder::new();
        let root = b.root();
        let p = b.element(root, "p");
        b.text(p, "left");
        b.text(p, "right");
        let d = b.build();
        let left = d.range_from_offsets(0, 4).unwrap();
        let right = d.range_from_offsets(4, 9).unwrap();
        assert!(!ranges_overlap(&d, &left, &right));
        assert!(ranges_overlap(&d, &left, &left));
    }

    #[test]
    fn blank_text_start_matches_nothing() {
        let d = doc("<p>anything</p>");
        assert!(find_matches(&d, &parts("  ", None, None, None)).is_empty());
    }

    const WORDS: &[&str] = &["ant", "bee", "cat", "dog", "eel"];

    fn sentence() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(WORDS), 1..30).prop_map(|w| w.join(" "))
    }

    /// Words whose raw form differs from their normalized form.
    const UNICODE_WORDS: &[&str] = &[
        "\u{1112}\u{1161}\u{11AB}\u{1100}\u{116E}\u{11A8}",
        "cafe\u{0301}",
        "\u{FF76}\u{FF9E}\u{FF78}",
        "\u{FB01}ne",
        "Stra\u{00DF}e",
        "\u{00C5}ngstr\u{00F6}m",
        "plain",
    ];

    proptest! {
        #[test]
        fn quotes_from_the_page_match_where_they_are_found(
            words in prop::collection::vec(prop::sample::select(UNICODE_WORDS), 1..12),
            from in 0_usize..12,
            len in 1_usize..4,
        ) {
            let d = doc(&format!("<p>{}</p>", words.join(" ")));
            let from = from % words.len();
            let to = (from + len).min(words.len());
            let quote = words[from..to].join(" ");
            let located = d.find_quote(&quote, 1);
            prop_assert!(located.is_some(), "quote not found: {:?}", quote);
            let located = located.unwrap();
            let found = find_matches(&d, &FragmentParts::exact(&quote));
            prop_assert!(!found.is_empty(), "no match for {:?}", quote);
            prop_assert!(found.iter().any(|m| ranges_overlap(&d, &m.range, &located)));
        }

        #[test]
        fn adding_parts_never_increases_match_count(
            body in sentence(),
            start in prop::sample::select(WORDS),
            end in prop::sample::select(WORDS),
            prefix in prop::sample::select(WORDS),
            suffix in prop::sample::select(WORDS),
        ) {
            let d = doc(&format!("<p>{body}</p>"));
            let bare = find_matches(&d, &parts(start, None, None, None)).len();
            let ranged = find_matches(&d, &parts(start, Some(end), None, None)).len();
            let prefixed = find_matches(&d, &parts(start, Some(end), Some(prefix), None)).len();
            let full = find_matches(&d, &parts(start, Some(end), Some(prefix), Some(suffix))).len();
            prop_assert!(ranged <= bare);
            prop_assert!(prefixed <= ranged);
            prop_assert!(full <= prefixed);
        }

        #[test]
        fn matching_is_deterministic(body in sentence(), start in prop::sample::select(WORDS)) {
            let d = doc(&format!("<p>{body}</p>"));
            let p = parts(start, None, None, None);
            prop_assert_eq!(find_matches(&d, &p), find_matches(&d, &p));
        }
    }
}
