use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{CONFIG_FILE, Config};
use crate::store::HighlightStore;

/// Exit code table shared by both outputs.
const EXIT_CODES: [(u8, &str); 4] = [
    (0, "Success / all highlights fresh"),
    (1, "Ambiguous highlights found, or a command failed"),
    (2, "Broken highlights found"),
    (3, "Runtime error during watch"),
];

/// Snapshot of the working directory shown under "Current State".
struct CurrentState {
    /// Whether `.fragmentum.toml` exists.
    config_found: bool,
    /// Highlight counts per page, `None` if the store is unreadable.
    pages: Option<Vec<(String, usize)>>,
    /// Resolved store path.
    store: PathBuf,
}

/// One exit code row.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// Process exit code.
    code: u8,
    /// What it signals.
    meaning: &'static str,
}

/// Top-level JSON document.
#[derive(Serialize)]
struct InfoJson {
    /// Working directory state.
    current_state: StateJson,
    /// Exit codes of `check` and `locate`.
    exit_codes: Vec<ExitCodeInfo>,
    /// Crate version.
    version: &'static str,
}

/// Highlight count of one page.
#[derive(Serialize)]
struct PageJson {
    /// Stored highlights.
    highlights: usize,
    /// Page URL.
    url: String,
}

/// JSON form of [`CurrentState`].
#[derive(Serialize)]
struct StateJson {
    /// Whether `.fragmentum.toml` exists.
    config_found: bool,
    /// Pages in the store, `null` if the store is unreadable.
    pages: Option<Vec<PageJson>>,
    /// Store path.
    store: String,
}

/// Collect config and store state for `root`.
fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(CONFIG_FILE).exists();
    let config = Config::load(root).unwrap_or_default();
    let store = root.join(&config.store);
    let pages = HighlightStore::read(&store).ok().map(|s| {
        return s
            .highlights
            .iter()
            .map(|(url, highlights)| return (url.clone(), highlights.len()))
            .collect();
    });
    return CurrentState {
        config_found,
        pages,
        store,
    };
}

/// JSON reference document.
fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_found: state.config_found,
            pages: state.pages.as_ref().map(|pages| {
                return pages
                    .iter()
                    .map(|(url, highlights)| {
                        return PageJson {
                            highlights: *highlights,
                            url: url.clone(),
                        };
                    })
                    .collect();
            }),
            store: state.store.display().to_string(),
        },
        exit_codes: EXIT_CODES
            .iter()
            .map(|&(code, meaning)| return ExitCodeInfo { code, meaning })
            .collect(),
        version: env!("CARGO_PKG_VERSION"),
    };

    // Plain strings and integers always serialize.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
    return;
}

/// Markdown reference document.
fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print!(
        "\
# fragmentum {version}

Generate text fragment links (`#:~:text=`) that point at exactly one place in
a page, collect them per page, and check that they still resolve.

## Fragment Syntax

    #:~:text=start                          exact match
    #:~:text=start,end                      range from start to end
    #:~:text=prefix-,start,end,-suffix      context around the match
    #:~:text=one&text=two                   several highlights in one URL

Components are percent-encoded; `,` `-` `&` never appear unencoded inside one.

## Workflow

    fragmentum generate page.html --quote <text> --url <url> [--add]
    fragmentum add <fragment-url>           Store a copied highlight link
    fragmentum list --url <url>             Show stored highlights
    fragmentum compile --url <url>          One URL with every highlight
    fragmentum check page.html --url <url>  Re-locate stored highlights (exit 0/1/2)
    fragmentum locate page.html <fragment-url>
    fragmentum serve                        JSON requests on stdin

## Configuration ({CONFIG_FILE})

    long_selection_threshold = 300          chars before a range pattern is used
    context_words = 3                       words of prefix/suffix per side
    max_expansion_iterations = 10           at least 1
    generation_timeout_ms = 500
    max_display_text_length = 100
    store = \".fragmentum-highlights.toml\"

## Current State

"
    );
    let found = if state.config_found { "found" } else { "not found" };
    println!("Config:  {CONFIG_FILE} ({found})");
    match &state.pages {
        None => println!("Store:   {} (unreadable)", state.store.display()),
        Some(pages) => {
            let total: usize = pages.iter().map(|(_, n)| return *n).sum();
            println!("Store:   {} ({total} highlights)", state.store.display());
            for (url, n) in pages {
                println!("         {url}: {n}");
            }
        },
    }

    println!();
    println!("## Exit Codes");
    println!();
    println!("| Code | Meaning |");
    println!("|------|---------|");
    for (code, meaning) in EXIT_CODES {
        println!("| {code}    | {meaning} |");
    }
    return;
}

/// Output the fragmentum reference document for the current directory.
pub fn run(json: bool) {
    let state = gather_state(&PathBuf::from("."));
    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
    return;
}
