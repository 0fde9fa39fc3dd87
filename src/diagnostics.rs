use crate::config::CONFIG_FILE;
use crate::error::Error;

/// ANSI bold on.
const BOLD: &str = "\x1b[1m";

/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Render `.fragmentum.toml` value errors.
fn render_config_invalid(key: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Config

`{key}` {reason}.

## Fix

Edit `{key}` in `{CONFIG_FILE}`, or remove it to use the default.
"
    );
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigInvalid { key, reason } => render_config_invalid(key, reason),
        Error::EmptySelection | Error::NoSelectionRange | Error::NoValidWords => render_selection(e),
        Error::FragmentUrlInvalid { input, reason } => render_fragment_url_invalid(input, reason),
        Error::HighlightNotFound { id, page_url } => render_highlight_not_found(id, page_url),
        Error::QuoteNotFound { occurrence, quote } => render_quote_not_found(quote, *occurrence),
        Error::StoreCorrupt { reason } => render_store_corrupt(reason),
        _ => render_generic(e),
    };
}

/// Render a rejected fragment link.
fn render_fragment_url_invalid(input: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Not a Text Fragment Link

`{input}`: {reason}.

## Expected

    https://example.com/page#:~:text=[prefix-,]start[,end][,-suffix]
"
    );
}

/// Render errors without a dedicated block.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!(
            "\
# Error: File Not Found

`{}` does not exist.
",
            path.display()
        ),
        Error::GenerationTimeout { budget_ms, elapsed_ms } => format!(
            "\
# Error: Generation Timed Out

Expansion stopped after {elapsed_ms} ms (budget {budget_ms} ms).

## Fix

Raise `generation_timeout_ms` in `{CONFIG_FILE}`.
"
        ),
        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),
        Error::Json(e) => format!(
            "\
# Error: Invalid JSON

{e}
"
        ),
        Error::ParseFailed { file, reason } => format!(
            "\
# Error: Parse Failed

Could not parse `{}`: {reason}
",
            file.display()
        ),
        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}
"
        ),
        Error::TomlSer(e) => format!(
            "\
# Error: TOML Serialization

{e}
"
        ),
        Error::Watch { reason } => format!(
            "\
# Error: Watch Failed

{reason}
"
        ),
        // Variants with a dedicated block are rendered by `render_error`.
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

/// Render a lookup of an unknown highlight id.
fn render_highlight_not_found(id: &str, page_url: &str) -> String {
    return format!(
        "\
# Error: Highlight Not Found

No highlight `{id}` is stored for {page_url}.

## Fix

List the stored ids:

    fragmentum list {page_url}
"
    );
}

/// Render a quote that does not occur in the document.
fn render_quote_not_found(quote: &str, occurrence: usize) -> String {
    let mut out = format!(
        "\
# Error: Quote Not Found

`{quote}` does not occur {occurrence} time(s) in the document.
"
    );
    out.push_str(
        "\
\n## Fix

Quotes are matched after whitespace collapsing and case folding. Check the
spelling, or lower `--occurrence`.
",
    );
    return out;
}

/// Render the fixed selection failures with their user-facing message.
fn render_selection(e: &Error) -> String {
    let message = e.user_message().unwrap_or("Invalid selection");
    return format!(
        "\
# Error: {message}

{e}.
"
    );
}

/// Render a store file that failed its consistency checks.
fn render_store_corrupt(reason: &str) -> String {
    return format!(
        "\
# Error: Highlight Store Corrupt

{reason}

## Fix

Remove the offending entries from the store file, or start over:

    fragmentum clear-all
"
    );
}
