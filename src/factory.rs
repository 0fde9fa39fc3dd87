//! Iterative expansion of a fragment until it uniquely points at its selection.
//!
//! Each iteration builds a candidate from the current state, validates it,
//! and grows the state in a fixed order when it is not yet unique:
//! start phrase, end phrase, prefix, suffix. Widening the matched text comes
//! before adding context. The loop is bounded by an iteration cap and by a
//! wall-clock budget checked at the top of every iteration.

use std::time::{Duration, Instant};

use crate::config::Config;
use crate::context;
use crate::document::{Document, DocumentRange};
use crate::encoder::{FragmentParts, encode_component};
use crate::error::Error;
use crate::matcher;
use crate::types::ValidationResult;

/// The last candidate of a finished loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryOutcome {
    /// Iterations run, starting at 1.
    pub iterations: usize,
    /// The returned descriptor.
    pub parts: FragmentParts,
    /// Validation of `parts`; not accepted means best effort.
    pub validation: ValidationResult,
}

/// Expansion state for one selection.
#[derive(Debug)]
pub struct FragmentFactory<'doc> {
    /// Words of context per enabled side.
    context_words: usize,
    /// Document being matched against.
    document: &'doc Document,
    /// Words taken from the end for `textEnd`.
    end_word_count: usize,
    /// Prefix context is attached.
    has_prefix: bool,
    /// Suffix context is attached.
    has_suffix: bool,
    /// Iteration cap.
    max_iterations: usize,
    /// The selection the fragment must point at.
    range: DocumentRange,
    /// Words taken from the start for `textStart`.
    start_word_count: usize,
    /// When the factory was created.
    started: Instant,
    /// Exact phrase or start/end pair.
    strategy: Strategy,
    /// Wall-clock budget.
    timeout: Duration,
    /// Normalized selection words, never empty.
    words: Vec<String>,
}

/// How the selected text is put into the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// The whole phrase as `textStart`.
    ExactMatch,
    /// Leading words as `textStart`, trailing words as `textEnd`.
    RangePattern,
}

impl<'doc> FragmentFactory<'doc> {
    /// Current descriptor. Context is extracted only for enabled sides.
    pub fn build(&self) -> FragmentParts {
        let parts = match self.strategy {
            Strategy::RangePattern if self.words.len() > 1 => {
                let tail = self.words.len().saturating_sub(self.end_word_count);
                FragmentParts {
                    text_end: Some(encode_component(&self.words.get(tail..).unwrap_or_default().join(" "))),
                    text_start: encode_component(&self.words.get(..self.start_word_count).unwrap_or_default().join(" ")),
                    ..FragmentParts::default()
                }
            },
            Strategy::ExactMatch | Strategy::RangePattern => FragmentParts::exact(&self.words.join(" ")),
        };
        if !(self.has_prefix || self.has_suffix) {
            return parts;
        }

        let prefix_words = if self.has_prefix { self.context_words } else { 0 };
        let suffix_words = if self.has_suffix { self.context_words } else { 0 };
        let ctx = context::extract(self.document, &self.range, prefix_words, suffix_words);
        return parts.with_context(&ctx.prefix, &ctx.suffix);
    }

    /// Grow the descriptor one step. Returns `false` once nothing is left to add.
    ///
    /// Start and end phrases each grow up to half the words (rounded down),
    /// so they never share a word. Exact matches already hold every word and
    /// go straight to context.
    pub fn expand(&mut self) -> bool {
        let half = self.words.len() / 2;
        if self.strategy == Strategy::RangePattern {
            if self.start_word_count < half {
                self.start_word_count = self.start_word_count.saturating_add(1);
                return true;
            }
            if self.end_word_count < half {
                self.end_word_count = self.end_word_count.saturating_add(1);
                return true;
            }
        }
        if !self.has_prefix {
            self.has_prefix = true;
            return true;
        }
        if !self.has_suffix {
            self.has_suffix = true;
            return true;
        }
        return false;
    }

    /// Start expanding `words` for `range`. The clock starts now.
    pub fn new(
        document: &'doc Document,
        range: DocumentRange,
        words: Vec<String>,
        strategy: Strategy,
        config: &Config,
    ) -> Self {
        return Self {
            context_words: config.context_words,
            document,
            end_word_count: 1,
            has_prefix: false,
            has_suffix: false,
            max_iterations: config.max_expansion_iterations.max(1),
            range,
            start_word_count: 1,
            started: Instant::now(),
            strategy,
            timeout: config.generation_timeout,
            words,
        };
    }

    /// Build, validate, and expand until the descriptor is unique and points
    /// at the selection, the cap is hit, or expansion runs out. The last two
    /// return the last candidate as best effort.
    ///
    /// # Errors
    ///
    /// Returns `Error::GenerationTimeout` when an iteration starts after the
    /// budget is spent.
    pub fn try_to_make_unique_fragment(&mut self) -> Result<FactoryOutcome, Error> {
        let mut iterations = 0_usize;
        loop {
            let elapsed = self.started.elapsed();
            if elapsed >= self.timeout {
                return Err(Error::GenerationTimeout {
                    budget_ms: self.timeout.as_millis(),
                    elapsed_ms: elapsed.as_millis(),
                });
            }
            iterations = iterations.saturating_add(1);

            let parts = self.build();
            let validation = matcher::validate(self.document, &parts, &self.range);
            tracing::debug!(
                iteration = iterations,
                strategy = ?self.strategy,
                match_count = validation.match_count,
                matches_selection = validation.matches_selection,
                "validated candidate"
            );

            if validation.is_accepted() || iterations >= self.max_iterations || !self.expand() {
                return Ok(FactoryOutcome {
                    iterations,
                    parts,
                    validation,
                });
            }
        }
    }
}
