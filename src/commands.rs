//! CLI commands for fragmentum: generate, collect, compile, and re-check
//! text fragment links.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::Config;
use crate::document::Document;
use crate::encoder::strip_fragment;
use crate::error;
use crate::freshness::{self, HighlightReport};
use crate::generator::FragmentGenerator;
use crate::link;
use crate::matcher;
use crate::messages;
use crate::selection::TextSelection;
use crate::store::{Highlight, HighlightStore};

/// What `generate` should select and how to report it.
pub struct GenerateOptions<'a> {
    /// Store the result as a highlight.
    pub add: bool,
    /// HTML file holding the page.
    pub document: &'a Path,
    /// Print the full result as JSON.
    pub json: bool,
    /// One-based occurrence of the quote.
    pub occurrence: usize,
    /// URL the fragment is rendered against.
    pub page_url: &'a str,
    /// Text to select.
    pub quote: &'a str,
}

/// Store the highlight carried by a "copy link to highlight" URL.
///
/// # Errors
///
/// Returns `Error::FragmentUrlInvalid` for links without a `text=`
/// directive, or store read/write errors.
pub fn add(fragment_url: &str) -> Result<(), error::Error> {
    let (config, store_path) = load_context()?;
    let parsed = link::parse_fragment_url(fragment_url)?;
    let highlight = Highlight::new(
        &parsed.page_url,
        &parsed.fragment,
        &parsed.selected_text,
        config.max_display_text_length,
    );
    let id = highlight.id.clone();

    let mut store = HighlightStore::read(&store_path)?;
    if store.add(highlight) {
        store.write(&store_path)?;
        eprintln!("Added {id} for {}", parsed.page_url);
    } else {
        eprintln!("Already stored as {id}");
    }
    println!("{id}");
    return Ok(());
}

/// Check the stored highlights of `page_url` against the page in `document`.
///
/// # Errors
///
/// Returns errors from config, store, or document loading.
pub fn check(document: &Path, page_url: &str) -> Result<ExitCode, error::Error> {
    let (_, store_path) = load_context()?;
    let store = HighlightStore::read(&store_path)?;
    let page = Document::load(document)?;
    let highlights = store.for_page(page_url);
    if highlights.is_empty() {
        println!("No highlights stored for {}", strip_fragment(page_url));
        return Ok(ExitCode::SUCCESS);
    }

    let reports = freshness::check_all(&page, highlights);
    print_reports(&reports);

    let broken = reports
        .iter()
        .filter(|r| return matches!(r.freshness, freshness::Freshness::Broken(_)))
        .count();
    let ambiguous = reports
        .iter()
        .filter(|r| return matches!(r.freshness, freshness::Freshness::Ambiguous(_)))
        .count();
    println!();
    if broken > 0 || ambiguous > 0 {
        println!("{broken} broken, {ambiguous} ambiguous");
    } else {
        println!("All {} highlights fresh", reports.len());
    }
    return Ok(ExitCode::from(freshness::exit_code(&reports)));
}

/// Remove every highlight of one page.
///
/// # Errors
///
/// Returns store read or write errors.
pub fn clear(page_url: &str) -> Result<(), error::Error> {
    let (_, store_path) = load_context()?;
    let mut store = HighlightStore::read(&store_path)?;
    let removed = store.clear_page(page_url);
    store.write(&store_path)?;
    eprintln!("Removed {removed} highlights from {}", strip_fragment(page_url));
    return Ok(());
}

/// Remove every stored highlight.
///
/// # Errors
///
/// Returns store read or write errors.
pub fn clear_all() -> Result<(), error::Error> {
    let (_, store_path) = load_context()?;
    let mut store = HighlightStore::read(&store_path)?;
    let removed = store.clear_all();
    store.write(&store_path)?;
    eprintln!("Removed {removed} highlights");
    return Ok(());
}

/// Print one URL that highlights everything stored for `page_url`.
///
/// # Errors
///
/// Returns store read errors.
pub fn compile(page_url: &str) -> Result<(), error::Error> {
    let (_, store_path) = load_context()?;
    let store = HighlightStore::read(&store_path)?;
    let highlights = store.for_page(page_url);
    println!("{}", link::compile(strip_fragment(page_url), highlights));
    eprintln!("Compiled {} highlights", highlights.len());
    return Ok(());
}

/// Generate a fragment URL for a quote in an HTML page.
///
/// # Errors
///
/// Returns document loading errors, `Error::QuoteNotFound`, selection
/// errors, or store errors when adding.
pub fn generate(options: &GenerateOptions<'_>) -> Result<(), error::Error> {
    let (config, store_path) = load_context()?;
    let page = Document::load(options.document)?;
    let selection = TextSelection::from_quote(&page, options.quote, options.occurrence)?;
    let max_display = config.max_display_text_length;
    let generated = FragmentGenerator::new(&page, options.page_url, config).generate(&selection)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&generated)?);
    } else {
        println!("{}", generated.url);
    }

    if options.add {
        let highlight = Highlight::new(
            options.page_url,
            &generated.parts.directive(),
            &generated.selected_text,
            max_display,
        );
        let id = highlight.id.clone();
        let mut store = HighlightStore::read(&store_path)?;
        if store.add(highlight) {
            store.write(&store_path)?;
        }
        eprintln!("Stored as {id}");
    }
    return Ok(());
}

/// Output the fragmentum reference card.
pub fn info(json: bool) {
    return crate::info::run(json);
}

/// List the stored highlights of one page.
///
/// # Errors
///
/// Returns store read errors, or `Error::Json` if JSON output fails.
pub fn list(page_url: &str, json: bool) -> Result<(), error::Error> {
    let (_, store_path) = load_context()?;
    let store = HighlightStore::read(&store_path)?;
    let highlights = store.for_page(page_url);

    if json {
        println!("{}", serde_json::to_string_pretty(highlights)?);
        return Ok(());
    }
    for h in highlights {
        println!("{}  {}  {}", h.id, h.fragment, h.selected_text);
    }
    if highlights.is_empty() {
        eprintln!("No highlights stored for {}", strip_fragment(page_url));
    }
    return Ok(());
}

/// Config and resolved store path for the current directory.
///
/// # Errors
///
/// Returns config loading errors.
fn load_context() -> Result<(Config, PathBuf), error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let store_path = root.join(&config.store);
    return Ok((config, store_path));
}

/// Show where each `text=` directive of a fragment link lands in a page.
/// Exit codes follow `check`: 2 if a directive matches nothing, 1 if one
/// matches more than once.
///
/// # Errors
///
/// Returns document loading errors or `Error::FragmentUrlInvalid`.
pub fn locate(document: &Path, fragment_url: &str) -> Result<ExitCode, error::Error> {
    let page = Document::load(document)?;
    let parsed = link::parse_fragment_url(fragment_url)?;
    let mut code = 0_u8;

    for directive in parsed.fragment.split('&').filter(|d| return d.starts_with("text=")) {
        let parts = link::parse_directive(directive)?;
        let matches = matcher::find_matches(&page, &parts);
        println!("{directive}: {} match(es)", matches.len());
        for m in &matches {
            let (start, end) = page.absolute_range(&m.range).unwrap_or_default();
            println!("  {start}..{end}  {}", m.text);
        }
        code = code.max(match matches.len() {
            0 => 2,
            1 => 0,
            _ => 1,
        });
    }
    return Ok(ExitCode::from(code));
}

/// Print one line per report.
fn print_reports(reports: &[HighlightReport<'_>]) {
    for report in reports {
        println!(
            "{:<24}  {}  {}",
            freshness::label(report.freshness),
            report.highlight.id,
            report.highlight.selected_text
        );
    }
    return;
}

/// Remove one highlight by id.
///
/// # Errors
///
/// Returns `Error::HighlightNotFound` if the page holds no such id, or
/// store read/write errors.
pub fn remove(id: &str, page_url: &str) -> Result<(), error::Error> {
    let (_, store_path) = load_context()?;
    let mut store = HighlightStore::read(&store_path)?;
    if !store.remove(id, page_url) {
        return Err(error::Error::HighlightNotFound {
            id: id.to_string(),
            page_url: strip_fragment(page_url).to_string(),
        });
    }
    store.write(&store_path)?;
    eprintln!("Removed {id}");
    return Ok(());
}

/// Answer JSON requests on stdin until it closes.
///
/// # Errors
///
/// Returns config errors or I/O errors on the streams.
pub fn serve() -> Result<(), error::Error> {
    let (config, store_path) = load_context()?;
    tracing::info!(store = %store_path.display(), "serving requests on stdin");
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    return messages::serve(stdin.lock(), stdout.lock(), &store_path, &config);
}

/// Show the freshness of every stored highlight of a page. Always exits 0.
///
/// # Errors
///
/// Returns errors from config, store, or document loading.
pub fn status(document: &Path, page_url: &str) -> Result<(), error::Error> {
    let (_, store_path) = load_context()?;
    let store = HighlightStore::read(&store_path)?;
    let page = Document::load(document)?;
    let reports = freshness::check_all(&page, store.for_page(page_url));
    print_reports(&reports);
    return Ok(());
}
