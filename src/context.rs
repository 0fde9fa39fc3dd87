//! Prefix and suffix words around a selection, scoped to its context ancestor.

use crate::document::{Document, DocumentRange, NodeId};
use crate::normalize;
use crate::tags;
use crate::types::SelectionContext;

/// Longest token accepted as a context word.
const MAX_WORD_CHARS: usize = 50;

/// Longest token accepted when it holds no letters.
const MAX_SYMBOL_WORD_CHARS: usize = 10;

/// Collect up to `prefix_words` words before and `suffix_words` words after
/// `range`, never reaching outside the nearest context-boundary ancestor of
/// the range start. Context is best effort: a range that cannot be placed in
/// the document yields empty context.
pub fn extract(document: &Document, range: &DocumentRange, prefix_words: usize, suffix_words: usize) -> SelectionContext {
    let Some((start, end)) = document.absolute_range(range) else {
        tracing::warn!(?range, "could not extract context: range is not inside the document");
        return SelectionContext::default();
    };
    let ancestor = find_context_ancestor(document, range.start.node);
    let Some((scope_start, scope_end)) = document.element_span(ancestor) else {
        tracing::warn!(?ancestor, "could not extract context: ancestor has no span");
        return SelectionContext::default();
    };

    let before = if start >= scope_start {
        document.text_between(scope_start, start)
    } else {
        String::new()
    };
    let after = document.text_between(end, scope_end);

    let prefix: Vec<String> = valid_words(&before);
    let suffix: Vec<String> = valid_words(&after);
    let skip = prefix.len().saturating_sub(prefix_words);

    return SelectionContext {
        prefix: prefix.get(skip..).unwrap_or_default().join(" "),
        suffix: suffix.get(..suffix_words.min(suffix.len())).unwrap_or_default().join(" "),
    };
}

/// Nearest ancestor of `node` that bounds context. List items are walked
/// through so sibling items can contribute. Falls back to the root.
fn find_context_ancestor(document: &Document, node: NodeId) -> NodeId {
    return document
        .ancestors(node)
        .into_iter()
        .find(|id| return document.tag(*id).is_some_and(|tag| return !tags::is_list_item(tag) && tags::is_context_boundary(tag)))
        .unwrap_or_else(|| return document.root());
}

/// Whether a token is usable as context. Rejects empty tokens, runaway
/// tokens, and long runs of digits and punctuation.
pub fn is_valid_word(word: &str) -> bool {
    let length = word.chars().count();
    if length == 0 || length > MAX_WORD_CHARS {
        return false;
    }
    let symbols_only = word.chars().all(|c| return c.is_ascii_digit() || !(c.is_alphanumeric() || c == '_'));
    return !(symbols_only && length > MAX_SYMBOL_WORD_CHARS);
}

/// Sanitize `text` and keep its valid words in order.
fn valid_words(text: &str) -> Vec<String> {
    return normalize::sanitize_context(text)
        .split(' ')
        .filter(|w| return is_valid_word(w))
        .map(str::to_string)
        .collect();
}
