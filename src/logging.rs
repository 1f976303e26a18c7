use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Logs to stderr so stdout only carries the report or JSON payload.
/// Warnings are always shown; `verbose` adds per-stage debug output.
pub fn init(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
