//! Re-locating stored highlights in the current version of a page.

use crate::document::Document;
use crate::link;
use crate::matcher;
use crate::store::Highlight;

/// Result of checking a single stored highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The fragment matches more than one place.
    Ambiguous(usize),
    /// The fragment is unparsable or matches nothing.
    Broken(&'static str),
    /// The fragment matches exactly one place.
    Fresh,
}

/// A highlight paired with its freshness.
#[derive(Debug, Clone)]
pub struct HighlightReport<'store> {
    /// The checked highlight.
    pub highlight: &'store Highlight,
    /// What the check found.
    pub freshness: Freshness,
}

/// Check every highlight against the document, in store order.
pub fn check_all<'store>(document: &Document, highlights: &'store [Highlight]) -> Vec<HighlightReport<'store>> {
    return highlights
        .iter()
        .map(|highlight| {
            return HighlightReport {
                freshness: check_highlight(document, highlight),
                highlight,
            };
        })
        .collect();
}

/// Check one stored highlight against the document.
pub fn check_highlight(document: &Document, highlight: &Highlight) -> Freshness {
    let Ok(parts) = link::parse_directive(&highlight.fragment) else {
        return Freshness::Broken("unparsable fragment");
    };
    return match matcher::find_matches(document, &parts).len() {
        0 => Freshness::Broken("text not found"),
        1 => Freshness::Fresh,
        n => Freshness::Ambiguous(n),
    };
}

/// Exit code priority: broken (2) > ambiguous (1) > fresh (0).
pub fn exit_code(reports: &[HighlightReport<'_>]) -> u8 {
    if reports.iter().any(|r| return matches!(r.freshness, Freshness::Broken(_))) {
        return 2;
    }
    if reports.iter().any(|r| return matches!(r.freshness, Freshness::Ambiguous(_))) {
        return 1;
    }
    return 0;
}

/// Fixed-width status label used by `check` and `status`.
pub fn label(freshness: Freshness) -> String {
    return match freshness {
        Freshness::Ambiguous(n) => format!("AMBIGUOUS ({n} matches)"),
        Freshness::Broken(reason) => format!("BROKEN ({reason})"),
        Freshness::Fresh => "FRESH".to_string(),
    };
}
