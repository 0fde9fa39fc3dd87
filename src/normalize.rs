//! Text normalization shared by fragment encoding and document matching.
//!
//! Whatever is encoded into a fragment and whatever is scanned during
//! validation must pass through the same pipeline, otherwise round trips
//! stop matching: NFKC, invisible-character stripping, whitespace collapse.

use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::{canonical_combining_class, compose, is_combining_mark};

/// Document text after normalization and case folding, with a map from each
/// normalized character back to the raw characters it came from.
#[derive(Debug, Default)]
pub struct NormalizedText {
    /// One entry per normalized character, in order.
    chars: Vec<SearchChar>,
    /// The normalized, folded text itself.
    text: String,
}

/// Origin of one normalized character.
#[derive(Debug, Clone, Copy)]
struct SearchChar {
    /// Byte offset of the character in `NormalizedText::text`.
    byte: usize,
    /// Raw char offset one past the source segment.
    raw_end: usize,
    /// Raw char offset where the source segment begins.
    raw_start: usize,
}

impl NormalizedText {
    /// The normalized text.
    pub fn as_str(&self) -> &str {
        return &self.text;
    }

    /// Normalize raw document characters. `breaks` holds sorted raw offsets
    /// of block edges; each behaves like whitespace between its neighbours.
    pub fn build(raw: &[char], breaks: &[usize]) -> Self {
        let mut out = Self::default();
        let mut pending_space: Option<(usize, usize)> = None;
        let mut index = 0_usize;

        while index < raw.len() {
            if breaks.binary_search(&index).is_ok() {
                pending_space.get_or_insert((index, index));
            }
            let end = segment_end(raw, index, breaks);
            let segment: String = raw
                .get(index..end)
                .unwrap_or_default()
                .iter()
                .filter(|c| return !is_invisible(**c))
                .collect();

            for c in segment.nfkc().flat_map(char::to_lowercase) {
                if c.is_whitespace() {
                    pending_space.get_or_insert((index, end));
                    continue;
                }
                if let Some((space_start, space_end)) = pending_space.take()
                    && !out.text.is_empty()
                {
                    out.push(' ', space_start, space_end);
                }
                out.push(c, index, end);
            }
            index = end;
        }

        return out;
    }

    /// Byte offset of the normalized character at `char_index`, or the text
    /// length when the index is one past the end.
    pub fn byte_at(&self, char_index: usize) -> usize {
        return self.chars.get(char_index).map_or(self.text.len(), |c| return c.byte);
    }

    /// Char index of the normalized character starting at `byte`.
    pub fn char_index(&self, byte: usize) -> Option<usize> {
        if byte == self.text.len() {
            return Some(self.chars.len());
        }
        return self.chars.binary_search_by_key(&byte, |c| return c.byte).ok();
    }

    /// Append one normalized character mapped to a raw segment.
    fn push(&mut self, c: char, raw_start: usize, raw_end: usize) {
        self.chars.push(SearchChar {
            byte: self.text.len(),
            raw_end,
            raw_start,
        });
        self.text.push(c);
    }

    /// Map the normalized char range `start..end` back to raw char offsets.
    /// Returns `None` for empty or out-of-bounds ranges.
    pub fn raw_span(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let last = end.checked_sub(1)?;
        if last < start {
            return None;
        }
        let first = self.chars.get(start)?;
        let last = self.chars.get(last)?;
        return Some((first.raw_start, last.raw_end));
    }
}

/// Lowercase character by character, matching how `NormalizedText` folds.
pub fn fold(text: &str) -> String {
    return text.chars().flat_map(char::to_lowercase).collect();
}

/// Characters that render as nothing: zero-width space/joiners, BOM, soft hyphen.
const fn is_invisible(c: char) -> bool {
    return matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}' | '\u{00AD}');
}

/// Canonicalize text for stable matching: NFKC, invisible characters
/// stripped, whitespace runs collapsed to one space, ends trimmed.
/// Idempotent.
pub fn normalize(text: &str) -> String {
    let composed: String = text
        .chars()
        .filter(|c| return !is_invisible(*c))
        .nfkc()
        .collect();
    return composed.split_whitespace().collect::<Vec<_>>().join(" ");
}

/// Normalize text picked up from neighbouring nodes for use as context.
/// Also drops ASCII control characters; whitespace controls become spaces.
pub fn sanitize_context(text: &str) -> String {
    let printable: String = text
        .chars()
        .filter(|c| return c.is_whitespace() || !c.is_ascii_control())
        .collect();
    return normalize(&printable);
}

/// Whether `c` has to be normalized together with a segment whose composed
/// form ends in `last`: invisible characters, combining marks, and anything
/// that composes onto `last` (conjoining jamo, halfwidth voicing marks).
fn joins_segment(last: Option<char>, c: char) -> bool {
    if is_invisible(c) || is_combining_mark(c) {
        return true;
    }
    let Some(head) = std::iter::once(c).nfkd().next() else {
        return false;
    };
    if canonical_combining_class(head) != 0 {
        return true;
    }
    return last.is_some_and(|l| return compose(l, head).is_some());
}

/// Last character of the composed, visible form of `segment`.
fn composed_last(segment: &[char]) -> Option<char> {
    return segment
        .iter()
        .copied()
        .filter(|c| return !is_invisible(*c))
        .nfkc()
        .last();
}

/// End of the segment starting at `start`: one base character plus every
/// following character that composes with it, never crossing a block break.
/// Each segment normalizes to the same text it would inside the whole run.
fn segment_end(raw: &[char], start: usize, breaks: &[usize]) -> usize {
    let mut end = start.saturating_add(1);
    let mut last = raw.get(start..end).and_then(composed_last);
    while let Some(&c) = raw.get(end) {
        if breaks.binary_search(&end).is_ok() || !joins_segment(last, c) {
            break;
        }
        end = end.saturating_add(1);
        if !is_invisible(c) {
            last = raw.get(start..end).and_then(composed_last);
        }
    }
    return end;
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn collapses_whitespace_and_line_breaks() {
        assert_eq!(normalize("  Quick\n\tbrown \u{00A0} fox  "), "Quick brown fox");
    }

    #[test]
    fn strips_invisible_characters() {
        assert_eq!(normalize("co\u{00AD}op\u{200B}era\u{FEFF}tive"), "cooperative");
    }

    #[test]
    fn applies_compatibility_composition() {
        assert_eq!(normalize("\u{FB01}ne caf\u{0065}\u{0301}"), "fine caf\u{00E9}");
    }

    #[test]
    fn sanitize_drops_controls_but_keeps_word_breaks() {
        assert_eq!(sanitize_context("alpha\u{0007}beta\ngamma\u{007F}"), "alphabeta gamma");
    }

    #[test]
    fn normalized_text_maps_back_to_raw_offsets() {
        let raw = chars("  Hello\n\n  World ");
        let text = NormalizedText::build(&raw, &[]);
        assert_eq!(text.as_str(), "hello world");
        assert_eq!(text.raw_span(0, 5), Some((2, 7)));
        assert_eq!(text.raw_span(6, 11), Some((11, 16)));
    }

    #[test]
    fn block_breaks_separate_words() {
        let raw = chars("endstart");
        let text = NormalizedText::build(&raw, &[3]);
        assert_eq!(text.as_str(), "end start");
    }

    #[test]
    fn composes_across_invisible_characters_like_normalize() {
        let raw = chars("cafe\u{200B}\u{0301}");
        let text = NormalizedText::build(&raw, &[]);
        assert_eq!(text.as_str(), fold(&normalize("cafe\u{200B}\u{0301}")));
    }

    #[test]
    fn composes_conjoining_jamo_like_normalize() {
        let decomposed = "\u{1112}\u{1161}\u{11AB}\u{1100}\u{116E}\u{11A8} text";
        let text = NormalizedText::build(&chars(decomposed), &[]);
        assert_eq!(text.as_str(), fold(&normalize(decomposed)));
        assert_eq!(text.as_str(), "\u{D55C}\u{AD6D} text");
        assert_eq!(text.raw_span(0, 1), Some((0, 3)));
        assert_eq!(text.raw_span(1, 2), Some((3, 6)));
    }

    #[test]
    fn composes_halfwidth_voicing_marks() {
        let raw = chars("\u{FF76}\u{FF9E}");
        let text = NormalizedText::build(&raw, &[]);
        assert_eq!(text.as_str(), "\u{30AC}");
        assert_eq!(text.as_str(), fold(&normalize("\u{FF76}\u{FF9E}")));
    }

    #[test]
    fn char_index_round_trips_byte_offsets() {
        let raw = chars("\u{00E9}t\u{00E9}");
        let text = NormalizedText::build(&raw, &[]);
        assert_eq!(text.char_index(text.byte_at(2)), Some(2));
        assert_eq!(text.char_index(text.as_str().len()), Some(3));
        assert_eq!(text.char_index(1), None);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in any::<String>()) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn sanitize_is_idempotent(s in any::<String>()) {
            let once = sanitize_context(&s);
            prop_assert_eq!(sanitize_context(&once), once.clone());
        }

        #[test]
        fn document_side_agrees_with_normalize(
            s in "(\\PC|[\u{1100}-\u{1112}][\u{1161}-\u{1175}][\u{11A8}-\u{11C2}]?|e\u{0301}|\u{FF76}\u{FF9E}|[ \n\t]){0,40}"
        ) {
            let text = NormalizedText::build(&chars(&s), &[]);
            prop_assert_eq!(text.as_str(), fold(&normalize(&s)));
        }
    }
}
