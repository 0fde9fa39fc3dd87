//! JSON request/response messaging for UI surfaces that don't own the store.
//!
//! Requests are tagged by `action`; responses carry the shape each action
//! has always had (`{success}`, `{highlights}`, `{url, count}`, ...). A
//! failing action answers with an `error` string instead of failing the loop.

use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::document::Document;
use crate::encoder::strip_fragment;
use crate::error::Error;
use crate::generator::FragmentGenerator;
use crate::link;
use crate::selection::TextSelection;
use crate::store::{Highlight, HighlightStore};

/// One request, keyed by its `action` field.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Drop every stored highlight.
    ClearAllHighlightsGlobal,
    /// Drop the highlights of one page.
    #[serde(rename_all = "camelCase")]
    ClearHighlights {
        /// Page to clear.
        page_url: String,
    },
    /// Build the multi-highlight URL of one page.
    #[serde(rename_all = "camelCase")]
    CompileHighlights {
        /// Page to compile.
        page_url: String,
    },
    /// Generate a fragment for a quote in an HTML document.
    #[serde(rename_all = "camelCase")]
    GenerateFragment {
        /// HTML source of the page.
        document: String,
        /// One-based occurrence of the quote to select.
        #[serde(default = "first_occurrence")]
        occurrence: usize,
        /// URL of the page.
        page_url: String,
        /// Text to select.
        quote: String,
    },
    /// List the highlights of one page.
    #[serde(rename_all = "camelCase")]
    GetHighlights {
        /// Page to list.
        page_url: String,
    },
    /// Store a highlight built by the caller.
    HighlightAdded {
        /// The highlight to store.
        data: Highlight,
    },
    /// Remove one highlight.
    #[serde(rename_all = "camelCase")]
    RemoveHighlight {
        /// Highlight id.
        id: String,
        /// Page the highlight belongs to.
        page_url: String,
    },
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Response {
    /// `compileHighlights` result.
    Compiled {
        /// Number of fragments compiled.
        count: usize,
        /// Failure description.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// The compiled URL, or the page URL on failure.
        url: String,
    },
    /// `clearAllHighlightsGlobal` and `clearHighlights` result.
    Counted {
        /// Number of highlights removed.
        count: usize,
        /// Failure description.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Whether the action succeeded.
        success: bool,
    },
    /// `generateFragment` success.
    #[serde(rename_all = "camelCase")]
    Generated {
        /// The `text=...` directive, as stored in a highlight.
        fragment: String,
        /// Normalized selected text.
        selected_text: String,
        /// Always true.
        success: bool,
        /// Full fragment URL.
        url: String,
    },
    /// `getHighlights` result.
    Highlights {
        /// Failure description.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Stored highlights of the page.
        highlights: Vec<Highlight>,
    },
    /// Result of actions that only report success.
    Status {
        /// Failure description.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Whether the action succeeded.
        success: bool,
    },
}

impl Response {
    /// A failed status reply.
    fn failure(error: &Error) -> Self {
        return Self::Status {
            error: Some(describe(error)),
            success: false,
        };
    }

    /// A successful status reply.
    const fn ok() -> Self {
        return Self::Status {
            error: None,
            success: true,
        };
    }
}

/// User-facing text of an error: the fixed selection messages where they
/// exist, otherwise the error itself.
fn describe(error: &Error) -> String {
    return error.user_message().map_or_else(|| return error.to_string(), str::to_string);
}

/// Default occurrence for `generateFragment`.
const fn first_occurrence() -> usize {
    return 1;
}

/// Generate a fragment for `quote` in `html`.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the HTML has no body, or any selection
/// or generation error.
fn generate(html: &str, quote: &str, occurrence: usize, page_url: &str, config: &Config) -> Result<Response, Error> {
    let document = Document::parse_html(html).ok_or_else(|| return Error::ParseFailed {
        file: "<message>".into(),
        reason: "no <body> element".to_string(),
    })?;
    let selection = TextSelection::from_quote(&document, quote, occurrence)?;
    let generated = FragmentGenerator::new(&document, page_url, config.clone()).generate(&selection)?;
    return Ok(Response::Generated {
        fragment: generated.parts.directive(),
        selected_text: generated.selected_text,
        success: true,
        url: generated.url,
    });
}

/// Perform one request against the store at `store_path`.
pub fn handle(request: Request, store_path: &Path, config: &Config) -> Response {
    tracing::debug!(?request, "handling request");
    return match request {
        Request::ClearAllHighlightsGlobal => match mutate(store_path, HighlightStore::clear_all) {
            Ok(count) => Response::Counted {
                count,
                error: None,
                success: true,
            },
            Err(e) => Response::Counted {
                count: 0,
                error: Some(describe(&e)),
                success: false,
            },
        },
        Request::ClearHighlights { page_url } => match mutate(store_path, |store| return store.clear_page(&page_url)) {
            Ok(count) => Response::Counted {
                count,
                error: None,
                success: true,
            },
            Err(e) => Response::failure(&e),
        },
        Request::CompileHighlights { page_url } => match HighlightStore::read(store_path) {
            Ok(store) => {
                let highlights = store.for_page(&page_url);
                Response::Compiled {
                    count: highlights.len(),
                    error: None,
                    url: link::compile(strip_fragment(&page_url), highlights),
                }
            },
            Err(e) => Response::Compiled {
                count: 0,
                error: Some(describe(&e)),
                url: page_url,
            },
        },
        Request::GenerateFragment {
            document,
            occurrence,
            page_url,
            quote,
        } => generate(&document, &quote, occurrence, &page_url, config).unwrap_or_else(|e| return Response::failure(&e)),
        Request::GetHighlights { page_url } => match HighlightStore::read(store_path) {
            Ok(store) => Response::Highlights {
                error: None,
                highlights: store.for_page(&page_url).to_vec(),
            },
            Err(e) => Response::Highlights {
                error: Some(describe(&e)),
                highlights: Vec::new(),
            },
        },
        Request::HighlightAdded { mut data } => {
            data.page_url = strip_fragment(&data.page_url).to_string();
            match mutate(store_path, |store| return store.add(data)) {
                Ok(_) => Response::ok(),
                Err(e) => Response::failure(&e),
            }
        },
        Request::RemoveHighlight { id, page_url } => match mutate(store_path, |store| return store.remove(&id, &page_url)) {
            Ok(_) => Response::ok(),
            Err(e) => Response::failure(&e),
        },
    };
}

/// Read the store, apply `action`, write it back.
///
/// # Errors
///
/// Returns store read or write errors.
fn mutate<T>(store_path: &Path, action: impl FnOnce(&mut HighlightStore) -> T) -> Result<T, Error> {
    let mut store = HighlightStore::read(store_path)?;
    let result = action(&mut store);
    store.write(store_path)?;
    return Ok(result);
}

/// Answer one JSON request per input line until the input ends. Blank lines
/// are skipped; unparsable lines get a failed status reply.
///
/// # Errors
///
/// Returns `Error::Io` if reading input or writing output fails, or
/// `Error::Json` if a response cannot be serialized.
pub fn serve(input: impl BufRead, mut output: impl Write, store_path: &Path, config: &Config) -> Result<(), Error> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle(request, store_path, config),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed request");
                Response::Status {
                    error: Some(format!("invalid request: {e}")),
                    success: false,
                }
            },
        };
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    const PAGE: &str = "https://example.com/a";

    fn send(store: &Path, request: Value) -> Value {
        let request: Request = serde_json::from_value(request).unwrap();
        serde_json::to_value(handle(request, store, &Config::default())).unwrap()
    }

    fn highlight(fragment: &str) -> Value {
        serde_json::to_value(Highlight::new(PAGE, fragment, "text", 100)).unwrap()
    }

    #[test]
    fn highlight_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.toml");

        assert_eq!(send(&store, json!({"action": "highlightAdded", "data": highlight("text=one")})), json!({"success": true}));
        send(&store, json!({"action": "highlightAdded", "data": highlight("text=two")}));

        let listed = send(&store, json!({"action": "getHighlights", "pageUrl": PAGE}));
        assert_eq!(listed["highlights"].as_array().unwrap().len(), 2);

        let compiled = send(&store, json!({"action": "compileHighlights", "pageUrl": PAGE}));
        assert_eq!(compiled, json!({"count": 2, "url": format!("{PAGE}#:~:text=one&text=two")}));

        let id = listed["highlights"][0]["id"].as_str().unwrap().to_string();
        assert_eq!(send(&store, json!({"action": "removeHighlight", "id": id, "pageUrl": PAGE})), json!({"success": true}));
        assert_eq!(
            send(&store, json!({"action": "clearHighlights", "pageUrl": PAGE})),
            json!({"count": 1, "success": true})
        );
        assert_eq!(
            send(&store, json!({"action": "clearAllHighlightsGlobal"})),
            json!({"count": 0, "success": true})
        );
    }

    #[test]
    fn compile_of_empty_page_returns_page_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.toml");
        assert_eq!(
            send(&store, json!({"action": "compileHighlights", "pageUrl": PAGE})),
            json!({"count": 0, "url": PAGE})
        );
    }

    #[test]
    fn generate_fragment_returns_url_and_directive() {
        let dir = tempfile::tempdir().unwrap();
        let reply = send(
            &dir.path().join("store.toml"),
            json!({
                "action": "generateFragment",
                "document": "<p>The Quick brown fox.</p>",
                "pageUrl": PAGE,
                "quote": "Quick brown fox",
            }),
        );
        assert_eq!(reply["success"], json!(true));
        assert_eq!(reply["fragment"], json!("text=Quick%20brown%20fox"));
        assert_eq!(reply["url"], json!(format!("{PAGE}#:~:text=Quick%20brown%20fox")));
    }

    #[test]
    fn generate_fragment_reports_missing_quote() {
        let dir = tempfile::tempdir().unwrap();
        let reply = send(
            &dir.path().join("store.toml"),
            json!({"action": "generateFragment", "document": "<p>x</p>", "pageUrl": PAGE, "quote": "absent"}),
        );
        assert_eq!(reply["success"], json!(false));
        assert!(reply["error"].as_str().unwrap().contains("absent"));
    }

    #[test]
    fn serve_answers_each_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.toml");
        let input = format!(
            "{}\n\nnot json\n{}\n",
            json!({"action": "highlightAdded", "data": highlight("text=one")}),
            json!({"action": "getHighlights", "pageUrl": PAGE}),
        );
        let mut output = Vec::new();
        serve(input.as_bytes(), &mut output, &store, &Config::default()).unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], json!({"success": true}));
        assert_eq!(lines[1]["success"], json!(false));
        assert_eq!(lines[2]["highlights"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_store_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.toml");
        std::fs::write(&store, "version = 9\n[highlights]\n").unwrap();
        let reply = send(&store, json!({"action": "getHighlights", "pageUrl": PAGE}));
        assert_eq!(reply["highlights"], json!([]));
        assert!(reply["error"].as_str().unwrap().contains("corrupt"));
    }
}
