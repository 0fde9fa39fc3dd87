//! Percent-encoding of fragment components and rendering of `#:~:text=` URLs.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Everything except ASCII alphanumerics and `_ . ~` is escaped. This is
/// `encodeURIComponent` plus the characters that act as separators in the
/// directive grammar (`-` `,`) or break URL parsing (`` ` `` `!` `'` `(` `)` `*` `/`).
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'~');

/// A text directive under construction. Every field holds already-encoded text.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentParts {
    /// Disambiguating text right before the match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Disambiguating text right after the match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Closing phrase; present only for range patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_end: Option<String>,
    /// Opening phrase, or the whole phrase for exact matches.
    pub text_start: String,
}

impl FragmentParts {
    /// Parts holding only an exact-match phrase, encoded here.
    pub fn exact(phrase: &str) -> Self {
        return Self {
            text_start: encode_component(phrase),
            ..Self::default()
        };
    }

    /// The directive without the `:~:` delimiter:
    /// `text=[prefix-,]textStart[,textEnd][,-suffix]`.
    pub fn directive(&self) -> String {
        let mut out = String::from("text=");
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            out.push_str("-,");
        }
        out.push_str(&self.text_start);
        if let Some(text_end) = &self.text_end {
            out.push(',');
            out.push_str(text_end);
        }
        if let Some(suffix) = &self.suffix {
            out.push_str(",-");
            out.push_str(suffix);
        }
        return out;
    }

    /// Attach encoded context. Empty context strings leave the side unset.
    pub fn with_context(mut self, prefix: &str, suffix: &str) -> Self {
        if !prefix.is_empty() {
            self.prefix = Some(encode_component(prefix));
        }
        if !suffix.is_empty() {
            self.suffix = Some(encode_component(suffix));
        }
        return self;
    }
}

/// Percent-decode a component. Invalid UTF-8 sequences become U+FFFD.
pub fn decode_component(text: &str) -> String {
    return percent_decode_str(text).decode_utf8_lossy().into_owned();
}

/// Percent-encode a component so no directive separator survives literally.
pub fn encode_component(text: &str) -> String {
    return utf8_percent_encode(text, COMPONENT).to_string();
}

/// Full fragment URL: `page_url` without its own fragment, then `#:~:` and
/// the directive.
pub fn render(page_url: &str, parts: &FragmentParts) -> String {
    return format!("{}#:~:{}", strip_fragment(page_url), parts.directive());
}

/// The URL up to, not including, its first `#`.
pub fn strip_fragment(url: &str) -> &str {
    return url.split_once('#').map_or(url, |(base, _)| return base);
}
