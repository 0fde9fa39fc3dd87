//! Multi-highlight URLs and parsing of copied fragment links.

use std::sync::LazyLock;

use regex::Regex;

use crate::encoder::{FragmentParts, decode_component};
use crate::error::Error;
use crate::store::Highlight;

/// Marker that starts the fragment directive inside a URL fragment.
const DIRECTIVE_DELIMITER: &str = ":~:";

/// First `text=` directive value in a directive list.
#[allow(clippy::unwrap_used, reason = "static pattern")]
static TEXT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| return Regex::new("text=([^&]+)").unwrap());

/// A "copy link to highlight" URL taken apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFragment {
    /// The directive list after `:~:`, starting with `text=`.
    pub fragment: String,
    /// URL before the `#`.
    pub page_url: String,
    /// Readable rendering of the first directive.
    pub selected_text: String,
}

/// One URL that highlights every given fragment:
/// `page_url#:~:text=..&text=..`. The page URL is returned unchanged when
/// there is nothing to compile.
pub fn compile(page_url: &str, highlights: &[Highlight]) -> String {
    if highlights.is_empty() {
        return page_url.to_string();
    }
    let fragments: Vec<&str> = highlights.iter().map(|h| return h.fragment.as_str()).collect();
    return format!("{page_url}#{DIRECTIVE_DELIMITER}{}", fragments.join("&"));
}

/// Readable text for a `text=` value: context dropped, range rendered as
/// `start ... end`.
fn display_text(value: &str) -> String {
    let mut components: Vec<&str> = value.split(',').collect();
    if components.len() > 1 && components.first().is_some_and(|c| return c.ends_with('-')) {
        components.remove(0);
    }
    if components.len() > 1 && components.last().is_some_and(|c| return c.starts_with('-')) {
        components.pop();
    }
    return components.into_iter().map(decode_component).collect::<Vec<_>>().join(" ... ");
}

/// Split a `text=` directive back into its encoded parts. The first
/// component ending in `-` is the prefix, a last component starting with
/// `-` is the suffix, and what remains is `textStart[,textEnd]`.
///
/// # Errors
///
/// Returns `Error::FragmentUrlInvalid` if the input is not a `text=`
/// directive or has no `textStart`, or too many components.
pub fn parse_directive(directive: &str) -> Result<FragmentParts, Error> {
    let invalid = |reason: &'static str| {
        return Error::FragmentUrlInvalid {
            input: directive.to_string(),
            reason,
        };
    };
    let value = directive
        .strip_prefix("text=")
        .ok_or_else(|| return invalid("missing `text=`"))?;
    let value = value.split('&').next().unwrap_or_default();

    let mut components: Vec<&str> = value.split(',').collect();
    let prefix = match components.first() {
        Some(first) if components.len() > 1 && first.ends_with('-') => {
            let prefix = first.strip_suffix('-').unwrap_or_default().to_string();
            components.remove(0);
            Some(prefix)
        },
        _ => None,
    };
    let suffix = match components.last() {
        Some(last) if components.len() > 1 && last.starts_with('-') => {
            let suffix = last.strip_prefix('-').unwrap_or_default().to_string();
            components.pop();
            Some(suffix)
        },
        _ => None,
    };

    let (text_start, text_end) = match components.as_slice() {
        [start] => (*start, None),
        [start, end] => (*start, Some((*end).to_string())),
        _ => return Err(invalid("expected `textStart` or `textStart,textEnd`")),
    };
    if text_start.is_empty() {
        return Err(invalid("empty `textStart`"));
    }

    return Ok(FragmentParts {
        prefix: prefix.filter(|p| return !p.is_empty()),
        suffix: suffix.filter(|s| return !s.is_empty()),
        text_end: text_end.filter(|e| return !e.is_empty()),
        text_start: text_start.to_string(),
    });
}

/// Parse a "copy link to highlight" URL. A heading anchor before the
/// directive (`#heading:~:text=...`) is allowed.
///
/// # Errors
///
/// Returns `Error::FragmentUrlInvalid` if the URL has no `#`, no `:~:`,
/// or the directive list does not start with `text=`.
pub fn parse_fragment_url(url: &str) -> Result<ParsedFragment, Error> {
    let invalid = |reason: &'static str| {
        return Error::FragmentUrlInvalid {
            input: url.to_string(),
            reason,
        };
    };
    let (page_url, full_fragment) = url.split_once('#').ok_or_else(|| return invalid("no `#` fragment"))?;
    let (_, fragment) = full_fragment
        .split_once(DIRECTIVE_DELIMITER)
        .ok_or_else(|| return invalid("no `:~:` directive"))?;
    if !fragment.starts_with("text=") {
        return Err(invalid("directive is not `text=`"));
    }
    let value = TEXT_DIRECTIVE
        .captures(fragment)
        .and_then(|c| return c.get(1))
        .ok_or_else(|| return invalid("empty `text=` directive"))?;

    return Ok(ParsedFragment {
        fragment: fragment.to_string(),
        page_url: page_url.to_string(),
        selected_text: display_text(value.as_str()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_component;

    #[test]
    fn compile_joins_fragments_with_ampersand() {
        let page = "https://example.com/p";
        let highlights = vec![
            Highlight::new(page, "text=one", "one", 100),
            Highlight::new(page, "text=two,three", "two", 100),
        ];
        assert_eq!(compile(page, &highlights), "https://example.com/p#:~:text=one&text=two,three");
        assert_eq!(compile(page, &[]), page);
    }

    #[test]
    fn parses_plain_fragment_url() {
        let parsed = parse_fragment_url("https://example.com/p#:~:text=Quick%20brown%20fox").unwrap();
        assert_eq!(parsed.page_url, "https://example.com/p");
        assert_eq!(parsed.fragment, "text=Quick%20brown%20fox");
        assert_eq!(parsed.selected_text, "Quick brown fox");
    }

    #[test]
    fn parses_url_with_heading_anchor() {
        let parsed = parse_fragment_url("https://example.com/p#setup:~:text=install").unwrap();
        assert_eq!(parsed.page_url, "https://example.com/p");
        assert_eq!(parsed.fragment, "text=install");
    }

    #[test]
    fn display_text_drops_context_and_marks_ranges() {
        let parsed = parse_fragment_url("https://e.com/#:~:text=the%20cat-,sat,mat,-today").unwrap();
        assert_eq!(parsed.selected_text, "sat ... mat");
    }

    #[test]
    fn display_text_keeps_encoded_punctuation() {
        let url = format!("https://e.com/#:~:text={}", encode_component("rates, -10%"));
        assert_eq!(parse_fragment_url(&url).unwrap().selected_text, "rates, -10%");
    }

    #[test]
    fn rejects_urls_without_directive() {
        assert!(parse_fragment_url("https://e.com/p").is_err());
        assert!(parse_fragment_url("https://e.com/p#intro").is_err());
        assert!(parse_fragment_url("https://e.com/p#:~:foo=bar").is_err());
    }

    #[test]
    fn directive_round_trips_through_parts() {
        for directive in ["text=a", "text=a,b", "text=p-,a", "text=a,-s", "text=p-,a,b,-s"] {
            assert_eq!(parse_directive(directive).unwrap().directive(), directive);
        }
    }

    #[test]
    fn directive_parts_are_identified_by_dashes() {
        let parts = parse_directive("text=before-,start,end,-after").unwrap();
        assert_eq!(parts.prefix.as_deref(), Some("before"));
        assert_eq!(parts.text_start, "start");
        assert_eq!(parts.text_end.as_deref(), Some("end"));
        assert_eq!(parts.suffix.as_deref(), Some("after"));
    }

    #[test]
    fn rejects_malformed_directives() {
        assert!(parse_directive("txt=a").is_err());
        assert!(parse_directive("text=").is_err());
        assert!(parse_directive("text=a,b,c").is_err());
    }
}
