/// Crate-level error types for fragmentum diagnostics.
use std::path::PathBuf;

/// All errors in fragmentum carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, page, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is out of its allowed range.
    #[error("invalid config: `{key}` {reason}")]
    ConfigInvalid {
        /// Name of the offending key in `.fragmentum.toml`.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The selection collapsed to nothing after normalization.
    #[error("no text selected")]
    EmptySelection,

    /// A referenced document file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A string is not a text fragment URL or directive.
    #[error("not a text fragment link: {input} ({reason})")]
    FragmentUrlInvalid {
        /// The rejected input.
        input: String,
        /// What was missing or malformed.
        reason: &'static str,
    },

    /// The expansion loop ran past its wall-clock budget.
    #[error("fragment generation timed out after {elapsed_ms} ms (budget {budget_ms} ms)")]
    GenerationTimeout {
        /// Configured budget in milliseconds.
        budget_ms: u128,
        /// Time spent when the budget check fired.
        elapsed_ms: u128,
    },

    /// No highlight with this id is stored for the page.
    #[error("highlight not found: `{id}` on {page_url}")]
    HighlightNotFound {
        /// Highlight identifier that was looked up.
        id: String,
        /// Page the highlight was expected on.
        page_url: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON encoding or decoding failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// The selection source reported zero ranges.
    #[error("no selection range available")]
    NoSelectionRange,

    /// Normalized selection text held nothing but punctuation and spaces.
    #[error("no valid words in selection")]
    NoValidWords,

    /// A document could not be loaded into a text tree.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The requested quote does not occur in the document often enough.
    #[error("quote not found: `{quote}` (occurrence {occurrence})")]
    QuoteNotFound {
        /// One-based occurrence that was requested.
        occurrence: usize,
        /// The quote as given on the command line.
        quote: String,
    },

    /// Highlight store exists but its contents are unusable.
    #[error("highlight store corrupt: {reason}")]
    StoreCorrupt {
        /// Description of the corruption.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),

    /// The filesystem watcher could not be started.
    #[error("watch: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },
}

impl Error {
    /// Short user-facing message for the fixed set of selection failures.
    /// Returns `None` for errors that have no dedicated UI message.
    pub const fn user_message(&self) -> Option<&'static str> {
        return match self {
            Self::EmptySelection | Self::NoValidWords => Some("Please select some text"),
            Self::NoSelectionRange => Some("No selection available"),
            _ => None,
        };
    }
}
