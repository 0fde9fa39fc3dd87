//! File watcher: runs `check` on startup, then re-runs when the page changes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::diagnostics;
use crate::error;

/// Quiet period after the last event before the page is re-checked.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that signals on changes to `file`.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(file: PathBuf, tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
            && event.paths.iter().any(|p| return p.file_name() == file.file_name())
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::Watch {
            reason: format!("cannot create watcher: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches the document's directory and
/// re-checks whenever the document changes.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the document is missing, or
/// `Error::Watch` if watching cannot start.
pub fn run(document: &Path, page_url: &str) -> Result<ExitCode, error::Error> {
    if !document.exists() {
        return Err(error::Error::FileNotFound {
            path: document.to_path_buf(),
        });
    }

    eprintln!("watch: checking {} against {page_url}", document.display());
    let mut last_code = run_check(document, page_url);

    let dir = document
        .parent()
        .filter(|p| return !p.as_os_str().is_empty())
        .map_or_else(|| return PathBuf::from("."), Path::to_path_buf);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(document.to_path_buf(), tx)?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| return error::Error::Watch { reason: format!("cannot watch {}: {e}", dir.display()) })?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", document.display());

    let quiet = Duration::from_millis(DEBOUNCE_MS);
    while rx.recv().is_ok() {
        // Drain the burst an editor save produces.
        while rx.recv_timeout(quiet).is_ok() {}
        eprintln!("watch: {} changed, re-checking", document.display());
        last_code = run_check(document, page_url);
    }

    return Ok(last_code);
}

/// One `check` pass. Errors are printed and mapped to exit code 3.
fn run_check(document: &Path, page_url: &str) -> ExitCode {
    return match commands::check(document, page_url) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}
