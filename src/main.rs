mod commands;
mod config;
mod context;
mod diagnostics;
mod document;
mod encoder;
mod error;
mod factory;
mod freshness;
mod generator;
mod info;
mod link;
mod matcher;
mod messages;
mod normalize;
mod selection;
mod store;
mod tags;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "fragmentum", version, about = "Generate, validate, and collect text fragment links", long_about = None)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log store mutations and generation progress to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Subcommands, one per `commands` function.
#[derive(Subcommand)]
enum Commands {
    /// Store the highlight of a "copy link to highlight" URL
    Add {
        /// URL containing `#:~:text=...`
        fragment_url: String,
    },
    /// Verify a page's stored highlights still match exactly once (exit 0/1/2)
    Check {
        /// HTML file with the current page
        document: PathBuf,
        /// Page URL the highlights are stored under
        #[arg(long)]
        url: String,
    },
    /// Remove every highlight of one page
    Clear {
        /// Page URL
        #[arg(long)]
        url: String,
    },
    /// Remove every stored highlight
    ClearAll,
    /// Print one URL that highlights everything stored for a page
    Compile {
        /// Page URL
        #[arg(long)]
        url: String,
    },
    /// Generate a unique text fragment URL for a quote in an HTML page
    Generate {
        /// Store the result as a highlight
        #[arg(long)]
        add: bool,
        /// HTML file with the page
        document: PathBuf,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Which occurrence of the quote to select (1-based)
        #[arg(long, default_value_t = 1)]
        occurrence: usize,
        /// Text to select
        #[arg(long)]
        quote: String,
        /// Page URL the fragment is rendered against
        #[arg(long)]
        url: String,
    },
    /// Print the reference card: fragment syntax, workflow, config, current state
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the stored highlights of one page
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Page URL
        #[arg(long)]
        url: String,
    },
    /// Show where each directive of a fragment link matches in a page
    Locate {
        /// HTML file with the page
        document: PathBuf,
        /// URL containing `#:~:text=...`
        fragment_url: String,
    },
    /// Remove one highlight by id
    Remove {
        /// Highlight id as printed by `list`
        id: String,
        /// Page URL
        #[arg(long)]
        url: String,
    },
    /// Answer JSON requests, one per line, on stdin
    Serve,
    /// Show the freshness of a page's stored highlights (always exit 0)
    Status {
        /// HTML file with the current page
        document: PathBuf,
        /// Page URL
        #[arg(long)]
        url: String,
    },
    /// Re-run check whenever the HTML file changes
    Watch {
        /// HTML file to watch
        document: PathBuf,
        /// Page URL
        #[arg(long)]
        url: String,
    },
}

/// Install the stderr subscriber: `RUST_LOG` wins, otherwise `warn`, or
/// `info` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_err| return EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    return;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    return match cli.command {
        Commands::Add { fragment_url } => report(commands::add(&fragment_url)),
        Commands::Check { document, url } => report_code(commands::check(&document, &url)),
        Commands::Clear { url } => report(commands::clear(&url)),
        Commands::ClearAll => report(commands::clear_all()),
        Commands::Compile { url } => report(commands::compile(&url)),
        Commands::Generate {
            add,
            document,
            json,
            occurrence,
            quote,
            url,
        } => report(commands::generate(&commands::GenerateOptions {
            add,
            document: &document,
            json,
            occurrence,
            page_url: &url,
            quote: &quote,
        })),
        Commands::Info { json } => {
            commands::info(json);
            ExitCode::SUCCESS
        },
        Commands::List { json, url } => report(commands::list(&url, json)),
        Commands::Locate { document, fragment_url } => report_code(commands::locate(&document, &fragment_url)),
        Commands::Remove { id, url } => report(commands::remove(&id, &url)),
        Commands::Serve => report(commands::serve()),
        Commands::Status { document, url } => report(commands::status(&document, &url)),
        Commands::Watch { document, url } => report_code(watch::run(&document, &url)),
    };
}

/// Map a unit result to an exit code, printing the diagnostic on failure.
fn report(result: Result<(), error::Error>) -> ExitCode {
    return report_code(result.map(|()| return ExitCode::SUCCESS));
}

/// Pass an exit code through, printing the diagnostic on failure.
fn report_code(result: Result<ExitCode, error::Error>) -> ExitCode {
    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}
