//! The selection a fragment is generated for.

use crate::document::{Document, DocumentRange};
use crate::error::Error;

/// Anything that can hand the generator a current selection.
pub trait SelectionSource {
    /// The range at `index`, if there is one.
    fn range_at(&self, index: usize) -> Option<DocumentRange>;

    /// Number of ranges in the selection.
    fn range_count(&self) -> usize;

    /// Plain-text rendering of the whole selection.
    fn text(&self) -> String;
}

/// A single-range selection over a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct TextSelection<'doc> {
    /// Document the range lives in.
    document: &'doc Document,
    /// The selected range, `None` for an empty selection.
    range: Option<DocumentRange>,
}

impl<'doc> TextSelection<'doc> {
    /// A selection with no ranges.
    pub const fn empty(document: &'doc Document) -> Self {
        return Self { document, range: None };
    }

    /// Select the chars between two absolute offsets.
    pub fn from_offsets(document: &'doc Document, start: usize, end: usize) -> Option<Self> {
        let range = document.range_from_offsets(start, end)?;
        return Some(Self {
            document,
            range: Some(range),
        });
    }

    /// Select the `occurrence`-th (one-based) appearance of `quote`, compared
    /// after normalization and case folding.
    ///
    /// # Errors
    ///
    /// Returns `Error::QuoteNotFound` if the quote does not occur that often.
    pub fn from_quote(document: &'doc Document, quote: &str, occurrence: usize) -> Result<Self, Error> {
        let range = document.find_quote(quote, occurrence).ok_or_else(|| return Error::QuoteNotFound {
            occurrence,
            quote: quote.to_string(),
        })?;
        return Ok(Self {
            document,
            range: Some(range),
        });
    }
}

impl SelectionSource for TextSelection<'_> {
    fn range_at(&self, index: usize) -> Option<DocumentRange> {
        return if index == 0 { self.range } else { None };
    }

    fn range_count(&self) -> usize {
        return usize::from(self.range.is_some());
    }

    fn text(&self) -> String {
        return self
            .range
            .and_then(|range| return self.document.range_text(&range))
            .unwrap_or_default();
    }
}
