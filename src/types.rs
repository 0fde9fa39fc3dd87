/// Core result types shared by the matcher, factory, and generator.
use crate::document::DocumentRange;

/// One occurrence of a fragment in a document. Recomputed on every
/// validation, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentMatch {
    /// Position of the match, from the start of `textStart` to the end of
    /// `textEnd` (or of `textStart` for exact matches).
    pub range: DocumentRange,
    /// Matched document text, block edges rendered as line breaks.
    pub text: String,
}

/// Plain-text words around a selection, bounded by a word count per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionContext {
    /// Words immediately before the selection.
    pub prefix: String,
    /// Words immediately after the selection.
    pub suffix: String,
}

/// Verdict on a candidate fragment against its original selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Exactly one match exists in the whole document.
    pub is_unique: bool,
    /// Number of matches found.
    pub match_count: usize,
    /// At least one match overlaps the selection.
    pub matches_selection: bool,
}

impl ValidationResult {
    /// Unique and pointing at the selection: the factory can stop here.
    pub const fn is_accepted(&self) -> bool {
        return self.is_unique && self.matches_selection;
    }
}
