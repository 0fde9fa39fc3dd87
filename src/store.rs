//! Highlight persistence: one TOML file, highlights grouped by page URL.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::encoder::strip_fragment;
use crate::error::Error;

/// Hex chars kept from the SHA-256 digest for a highlight id.
const ID_HEX_CHARS: usize = 16;

/// Schema version written to and expected in the store file.
pub const STORE_VERSION: u32 = 1;

/// One collected fragment. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// The `text=...` directive, already encoded.
    pub fragment: String,
    /// Content-derived identifier, see [`highlight_id`].
    pub id: String,
    /// Page URL without its fragment.
    pub page_url: String,
    /// Selected text for display, possibly truncated.
    pub selected_text: String,
    /// Capture time in Unix milliseconds.
    pub timestamp: i64,
}

impl Highlight {
    /// A highlight captured now. The page URL loses its fragment and the
    /// display text is cut to `max_display_chars`.
    pub fn new(page_url: &str, fragment: &str, selected_text: &str, max_display_chars: usize) -> Self {
        let page_url = strip_fragment(page_url);
        return Self {
            fragment: fragment.to_string(),
            id: highlight_id(page_url, fragment),
            page_url: page_url.to_string(),
            selected_text: truncate_display(selected_text, max_display_chars),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
    }
}

/// All stored highlights. Pages with no highlights are never kept.
#[allow(clippy::arbitrary_source_item_ordering, reason = "TOML needs plain values before tables")]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HighlightStore {
    /// Schema version, always [`STORE_VERSION`].
    pub version: u32,
    /// Highlights per page URL, in insertion order.
    pub highlights: BTreeMap<String, Vec<Highlight>>,
}

impl HighlightStore {
    /// Add a highlight under its page. Returns `false` if the page already
    /// holds a highlight with the same id.
    pub fn add(&mut self, highlight: Highlight) -> bool {
        let page = self.highlights.entry(highlight.page_url.clone()).or_default();
        if page.iter().any(|h| return h.id == highlight.id) {
            return false;
        }
        tracing::info!(id = %highlight.id, page = %highlight.page_url, "highlight added");
        page.push(highlight);
        return true;
    }

    /// Drop every highlight. Returns how many were removed.
    pub fn clear_all(&mut self) -> usize {
        let count = self.total();
        self.highlights.clear();
        tracing::info!(count, "all highlights cleared");
        return count;
    }

    /// Drop a page's highlights. Returns how many were removed.
    pub fn clear_page(&mut self, page_url: &str) -> usize {
        let count = self.highlights.remove(strip_fragment(page_url)).map_or(0, |page| return page.len());
        tracing::info!(count, page = %page_url, "page highlights cleared");
        return count;
    }

    /// Highlights stored for a page, in insertion order.
    pub fn for_page(&self, page_url: &str) -> &[Highlight] {
        return self
            .highlights
            .get(strip_fragment(page_url))
            .map_or(&[], |page| return page.as_slice());
    }

    /// An empty store.
    pub const fn new() -> Self {
        return Self {
            version: STORE_VERSION,
            highlights: BTreeMap::new(),
        };
    }

    /// Parse a store from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid TOML, or
    /// `Error::StoreCorrupt` if the version is unknown, a highlight sits
    /// under the wrong page, or an id repeats within a page.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let store: Self = toml::from_str(content)?;
        enforce_store_consistency(&store)?;
        return Ok(store);
    }

    /// Read a store from disk. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for read failures other than not-found,
    /// `Error::TomlDe` for invalid TOML, or `Error::StoreCorrupt`.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Remove one highlight. The page entry goes away with its last highlight.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, id: &str, page_url: &str) -> bool {
        let key = strip_fragment(page_url);
        let Some(page) = self.highlights.get_mut(key) else {
            return false;
        };
        let before = page.len();
        page.retain(|h| return h.id != id);
        let removed = page.len() != before;
        if page.is_empty() {
            self.highlights.remove(key);
        }
        if removed {
            tracing::info!(%id, page = %key, "highlight removed");
        }
        return removed;
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        return Ok(toml::to_string_pretty(self)?);
    }

    /// Number of highlights across all pages.
    pub fn total(&self) -> usize {
        return self.highlights.values().map(Vec::len).sum();
    }

    /// Write the store to disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let content = self.serialize()?;
        std::fs::write(path, content)?;
        return Ok(());
    }
}

impl Default for HighlightStore {
    fn default() -> Self {
        return Self::new();
    }
}

/// Check the invariants `HighlightStore::add` maintains.
///
/// # Errors
///
/// Returns `Error::StoreCorrupt` on the first violation.
fn enforce_store_consistency(store: &HighlightStore) -> Result<(), Error> {
    if store.version != STORE_VERSION {
        return Err(Error::StoreCorrupt {
            reason: format!("unsupported version {} (expected {STORE_VERSION})", store.version),
        });
    }
    for (page_url, highlights) in &store.highlights {
        if highlights.is_empty() {
            return Err(Error::StoreCorrupt {
                reason: format!("empty page entry: {page_url}"),
            });
        }
        for (index, highlight) in highlights.iter().enumerate() {
            if highlight.page_url != *page_url {
                return Err(Error::StoreCorrupt {
                    reason: format!("highlight `{}` filed under {page_url} but belongs to {}", highlight.id, highlight.page_url),
                });
            }
            if highlights.iter().take(index).any(|h| return h.id == highlight.id) {
                return Err(Error::StoreCorrupt {
                    reason: format!("duplicate highlight id `{}` on {page_url}", highlight.id),
                });
            }
        }
    }
    return Ok(());
}

/// Identifier derived from page and fragment, so storing the same
/// highlight twice yields the same id.
pub fn highlight_id(page_url: &str, fragment: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(fragment.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    return digest.chars().take(ID_HEX_CHARS).collect();
}

/// Cut `text` to `max_chars` chars, marking the cut with `...`.
pub fn truncate_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    return out;
}
