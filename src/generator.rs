//! Entry point: turn a selection into a text fragment URL.
//!
//! The selection is widened to whole words, normalized, and split. One word
//! takes a short path with a single disambiguation attempt. Longer selections
//! pick a strategy and run the factory; a factory failure, timeout included,
//! falls back to a deterministic descriptor so the caller always gets a URL.

use crate::config::Config;
use crate::context;
use crate::document::{Document, DocumentRange};
use crate::encoder::{self, FragmentParts, encode_component};
use crate::error::Error;
use crate::factory::{FragmentFactory, Strategy};
use crate::matcher;
use crate::normalize;
use crate::selection::SelectionSource;

/// Selections of at most this many words fall back to the whole phrase.
const FALLBACK_EXACT_WORDS: usize = 3;

/// Minimum words per side in a fallback range pattern.
const FALLBACK_MIN_EDGE_WORDS: usize = 2;

/// A generated fragment and how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFragment {
    /// How the descriptor was obtained.
    pub outcome: GenerationOutcome,
    /// The final descriptor.
    pub parts: FragmentParts,
    /// Normalized text of the widened selection.
    pub selected_text: String,
    /// Strategy used for the descriptor.
    pub strategy: Strategy,
    /// Page URL with the rendered directive.
    pub url: String,
}

/// How a fragment came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GenerationOutcome {
    /// Expansion ran out or hit the cap; the fragment may match elsewhere too.
    #[serde(rename_all = "camelCase")]
    BestEffort {
        /// Iterations run.
        iterations: usize,
        /// Matches of the returned descriptor.
        match_count: usize,
    },
    /// The factory failed and a deterministic descriptor was used instead.
    Fallback,
    /// Single-word selection.
    SingleWord {
        /// Context was attached because the word alone was not unique.
        disambiguated: bool,
    },
    /// Validated as unique and pointing at the selection.
    Unique {
        /// Iterations needed.
        iterations: usize,
    },
}

/// Generates fragments for selections in one document.
#[derive(Debug)]
pub struct FragmentGenerator<'doc> {
    /// Generation settings.
    config: Config,
    /// Document the selections live in.
    document: &'doc Document,
    /// URL of the page; any `#...` is dropped when rendering.
    page_url: String,
}

impl<'doc> FragmentGenerator<'doc> {
    /// Deterministic descriptor used when the factory fails: the whole phrase
    /// for short selections, otherwise the first and last third of the words
    /// (at least two each). Context is always attached.
    fn fallback(&self, words: &[String], range: &DocumentRange) -> FragmentParts {
        let parts = if words.len() <= FALLBACK_EXACT_WORDS {
            FragmentParts::exact(&words.join(" "))
        } else {
            let edge = (words.len() / 3).max(FALLBACK_MIN_EDGE_WORDS);
            let tail = words.len().saturating_sub(edge);
            FragmentParts {
                text_end: Some(encode_component(&words.get(tail..).unwrap_or_default().join(" "))),
                text_start: encode_component(&words.get(..edge).unwrap_or_default().join(" ")),
                ..FragmentParts::default()
            }
        };
        let ctx = context::extract(self.document, range, self.config.context_words, self.config.context_words);
        return parts.with_context(&ctx.prefix, &ctx.suffix);
    }

    /// Generate a fragment URL for the first range of `selection`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSelectionRange` if the selection has no range (or
    /// its range is not in this document), `Error::EmptySelection` if it
    /// holds only whitespace, or `Error::NoValidWords` if it holds nothing
    /// but punctuation.
    pub fn generate<S: SelectionSource + ?Sized>(&self, selection: &S) -> Result<GeneratedFragment, Error> {
        if selection.range_count() == 0 {
            return Err(Error::NoSelectionRange);
        }
        let range = selection.range_at(0).ok_or(Error::NoSelectionRange)?;
        if normalize::normalize(&selection.text()).is_empty() {
            return Err(Error::EmptySelection);
        }
        let (start, end) = self.document.absolute_range(&range).ok_or(Error::NoSelectionRange)?;

        let (start, end) = expand_to_word_boundaries(self.document, start, end);
        let range = self.document.range_from_offsets(start, end).unwrap_or(range);
        let selected_text = normalize::normalize(&self.document.text_between(start, end));
        if selected_text.is_empty() {
            return Err(Error::EmptySelection);
        }

        if selected_text.chars().all(is_word_boundary) {
            return Err(Error::NoValidWords);
        }
        let words: Vec<String> = selected_text.split(' ').map(str::to_string).collect();
        if let [word] = words.as_slice() {
            let (parts, disambiguated) = self.single_word(word, &range);
            return Ok(self.finish(parts, GenerationOutcome::SingleWord { disambiguated }, selected_text, Strategy::ExactMatch));
        }

        let strategy = if selected_text.chars().count() > self.config.long_selection_threshold
            || self.document.crosses_block(&range)
        {
            Strategy::RangePattern
        } else {
            Strategy::ExactMatch
        };

        let mut factory = FragmentFactory::new(self.document, range, words.clone(), strategy, &self.config);
        return match factory.try_to_make_unique_fragment() {
            Ok(outcome) => {
                let kind = if outcome.validation.is_accepted() {
                    GenerationOutcome::Unique {
                        iterations: outcome.iterations,
                    }
                } else {
                    GenerationOutcome::BestEffort {
                        iterations: outcome.iterations,
                        match_count: outcome.validation.match_count,
                    }
                };
                Ok(self.finish(outcome.parts, kind, selected_text, strategy))
            },
            Err(err) => {
                tracing::warn!(%err, "fragment generation failed, using fallback");
                let parts = self.fallback(&words, &range);
                let strategy = if parts.text_end.is_some() {
                    Strategy::RangePattern
                } else {
                    Strategy::ExactMatch
                };
                Ok(self.finish(parts, GenerationOutcome::Fallback, selected_text, strategy))
            },
        };
    }

    /// Render `parts` against the page URL.
    fn finish(
        &self,
        parts: FragmentParts,
        outcome: GenerationOutcome,
        selected_text: String,
        strategy: Strategy,
    ) -> GeneratedFragment {
        return GeneratedFragment {
            outcome,
            url: encoder::render(&self.page_url, &parts),
            parts,
            selected_text,
            strategy,
        };
    }

    /// Generator for `document`, rendered against `page_url`.
    pub fn new(document: &'doc Document, page_url: &str, config: Config) -> Self {
        return Self {
            config,
            document,
            page_url: page_url.to_string(),
        };
    }

    /// One word: bare if unique, otherwise one attempt with context on both
    /// sides. Returns the parts and whether context was attached.
    fn single_word(&self, word: &str, range: &DocumentRange) -> (FragmentParts, bool) {
        let parts = FragmentParts::exact(word);
        if matcher::validate(self.document, &parts, range).is_accepted() {
            return (parts, false);
        }
        let ctx = context::extract(self.document, range, self.config.context_words, self.config.context_words);
        return (parts.with_context(&ctx.prefix, &ctx.suffix), true);
    }
}

/// Widen `start..end` to whole words when either edge falls inside a word.
/// Stops at boundary characters, block edges, and the ends of the text.
pub fn expand_to_word_boundaries(document: &Document, start: usize, end: usize) -> (usize, usize) {
    let is_word_char = |position: usize| return document.char_at(position).is_some_and(|c| return !is_word_boundary(c));

    let mut start = start;
    if is_word_char(start) {
        while let Some(previous) = start.checked_sub(1)
            && !document.is_block_break(start)
            && is_word_char(previous)
        {
            start = previous;
        }
    }

    let mut end = end;
    if let Some(last) = end.checked_sub(1)
        && is_word_char(last)
    {
        while !document.is_block_break(end) && is_word_char(end) {
            end = end.saturating_add(1);
        }
    }
    return (start, end);
}

/// Whitespace, Unicode space separators, and the punctuation that ends a word.
pub fn is_word_boundary(c: char) -> bool {
    return c.is_whitespace()
        || matches!(
            c,
            '\u{00A0}'
                | '\u{1680}'
                | '\u{2000}'..='\u{200A}'
                | '\u{2028}'
                | '\u{2029}'
                | '\u{202F}'
                | '\u{205F}'
                | '\u{3000}'
                | '.'
                | ','
                | ';'
                | ':'
                | '!'
                | '?'
                | '\''
                | '"'
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '<'
                | '>'
                | '/'
                | '\\'
                | '|'
                | '@'
                | '#'
                | '$'
                | '%'
                | '^'
                | '&'
                | '*'
                | '+'
                | '='
                | '~'
                | '`'
                | '-'
        );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::selection::TextSelection;

    const PAGE: &str = "https://example.com/page#section";

    fn doc(html: &str) -> Document {
        Document::parse_html(html).unwrap()
    }

    fn generate_quote(d: &Document, quote: &str, occurrence: usize, config: Config) -> Result<GeneratedFragment, Error> {
        let selection = TextSelection::from_quote(d, quote, occurrence).unwrap();
        FragmentGenerator::new(d, PAGE, config).generate(&selection)
    }

    #[test]
    fn short_unique_phrase() {
        let d = doc("<p>The Quick brown fox jumps over the lazy dog.</p>");
        let fragment = generate_quote(&d, "Quick brown fox", 1, Config::default()).unwrap();
        assert_eq!(fragment.url, "https://example.com/page#:~:text=Quick%20brown%20fox");
        assert_eq!(fragment.outcome, GenerationOutcome::Unique { iterations: 1 });
        assert_eq!(fragment.strategy, Strategy::ExactMatch);
    }

    #[test]
    fn duplicate_phrase_forces_expansion() {
        let d = doc("<p>We like green tea. They like green tea too.</p>");
        let fragment = generate_quote(&d, "like green tea", 2, Config::default()).unwrap();
        match fragment.outcome {
            GenerationOutcome::Unique { iterations } => assert!(iterations >= 2),
            GenerationOutcome::BestEffort { match_count, .. } => assert!(match_count > 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(fragment.parts.prefix.is_some() || fragment.parts.suffix.is_some());
    }

    #[test]
    fn long_selection_uses_start_and_end() {
        let sentence = "Lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor. ";
        let body = sentence.repeat(5);
        let d = doc(&format!("<p>{body}</p>"));
        let quote = body.trim();
        let fragment = generate_quote(&d, quote, 1, Config::default()).unwrap();
        assert!(fragment.selected_text.chars().count() > 300);
        assert_eq!(fragment.strategy, Strategy::RangePattern);
        assert!(fragment.parts.text_end.is_some());
    }

    #[test]
    fn block_crossing_uses_start_and_end() {
        let d = doc("<p>first paragraph ends</p><p>second paragraph starts</p>");
        let fragment = generate_quote(&d, "ends second", 1, Config::default()).unwrap();
        assert_eq!(fragment.strategy, Strategy::RangePattern);
        assert_eq!(fragment.parts.directive(), "text=ends,second");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let d = doc("<p>Interest rates, -10% this year</p>");
        let fragment = generate_quote(&d, "rates, -10%", 1, Config::default()).unwrap();
        let (_, directive) = fragment.url.split_once("#:~:").unwrap();
        assert_eq!(directive, "text=rates%2C%20%2D10%25");
        assert!(!directive.contains(',') && !directive.contains('-'));
    }

    #[test]
    fn timeout_falls_back_to_a_complete_url() {
        let d = doc("<p>Alpha beta gamma delta epsilon zeta eta theta iota.</p>");
        let config = Config {
            generation_timeout: Duration::ZERO,
            ..Config::default()
        };
        let fragment = generate_quote(&d, "beta gamma delta epsilon zeta eta", 1, config).unwrap();
        assert_eq!(fragment.outcome, GenerationOutcome::Fallback);
        assert_eq!(
            fragment.url,
            "https://example.com/page#:~:text=Alpha-,beta%20gamma,zeta%20eta,-theta%20iota."
        );
    }

    #[test]
    fn timeout_fallback_keeps_short_phrases_whole() {
        let d = doc("<p>one two three four</p>");
        let config = Config {
            generation_timeout: Duration::ZERO,
            ..Config::default()
        };
        let fragment = generate_quote(&d, "two three", 1, config).unwrap();
        assert_eq!(fragment.parts.directive(), "text=one-,two%20three,-four");
    }

    #[test]
    fn single_unique_word_is_bare() {
        let d = doc("<p>An unusual word here.</p>");
        let fragment = generate_quote(&d, "unusual", 1, Config::default()).unwrap();
        assert_eq!(fragment.parts.directive(), "text=unusual");
        assert_eq!(fragment.outcome, GenerationOutcome::SingleWord { disambiguated: false });
    }

    #[test]
    fn repeated_single_word_gets_context() {
        let d = doc("<p>A cat sat. Another cat ran away.</p>");
        let fragment = generate_quote(&d, "cat", 2, Config::default()).unwrap();
        assert_eq!(fragment.outcome, GenerationOutcome::SingleWord { disambiguated: true });
        assert_eq!(fragment.parts.directive(), "text=cat%20sat.%20Another-,cat,-ran%20away.");
    }

    #[test]
    fn partial_words_are_widened() {
        let d = doc("<p>The Quick brown fox.</p>");
        let selection = TextSelection::from_offsets(&d, 5, 12).unwrap();
        assert_eq!(selection.text(), "uick br");
        let fragment = FragmentGenerator::new(&d, PAGE, Config::default()).generate(&selection).unwrap();
        assert_eq!(fragment.selected_text, "Quick brown");
    }

    #[test]
    fn widening_stops_at_block_edges() {
        let d = doc("<p>end</p><p>start here</p>");
        assert_eq!(expand_to_word_boundaries(&d, 3, 5), (3, 8));
    }

    #[test]
    fn no_range_is_reported() {
        let d = doc("<p>text</p>");
        let err = FragmentGenerator::new(&d, PAGE, Config::default()).generate(&TextSelection::empty(&d)).unwrap_err();
        assert!(matches!(err, Error::NoSelectionRange));
        assert_eq!(err.user_message(), Some("No selection available"));
    }

    #[test]
    fn whitespace_selection_is_empty() {
        let d = doc("<p>a   b</p>");
        let selection = TextSelection::from_offsets(&d, 1, 4).unwrap();
        let err = FragmentGenerator::new(&d, PAGE, Config::default()).generate(&selection).unwrap_err();
        assert!(matches!(err, Error::EmptySelection));
        assert_eq!(err.user_message(), Some("Please select some text"));
    }

    #[test]
    fn punctuation_only_selection_has_no_words() {
        let d = doc("<p>Wait... what?</p>");
        let err = generate_quote(&d, "...", 1, Config::default()).unwrap_err();
        assert!(matches!(err, Error::NoValidWords));
        assert_eq!(err.user_message(), Some("Please select some text"));
    }

    #[test]
    fn decomposed_hangul_selection_matches_itself() {
        let nfd = "\u{1112}\u{1161}\u{11AB}\u{1100}\u{116E}\u{11A8}";
        let d = doc(&format!("<p>{nfd} text here</p>"));
        let selection = TextSelection::from_offsets(&d, 0, 11).unwrap();
        let fragment = FragmentGenerator::new(&d, PAGE, Config::default()).generate(&selection).unwrap();
        assert_eq!(fragment.outcome, GenerationOutcome::Unique { iterations: 1 });
        assert_eq!(fragment.parts.directive(), "text=%ED%95%9C%EA%B5%AD%20text");
        let range = d.range_from_offsets(0, 11).unwrap();
        let validation = matcher::validate(&d, &fragment.parts, &range);
        assert_eq!(validation.match_count, 1);
        assert!(validation.matches_selection);
    }

    #[test]
    fn boundary_set_covers_punctuation_and_spaces() {
        for c in ['.', '-', '`', '\u{00A0}', '\u{3000}', '\n'] {
            assert!(is_word_boundary(c), "{c:?}");
        }
        for c in ['a', '_', '\u{00E9}', '7'] {
            assert!(!is_word_boundary(c), "{c:?}");
        }
    }
}
