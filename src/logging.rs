use std::time::Instant;

use tracing_subscriber::EnvFilter;

/// Progress is reported once per this many processed items.
pub const PROGRESS_EVERY: usize = 1000;

/// Installs the stderr `fmt` subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Runs `f` and logs its wall time under `label`.
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    tracing::info!(
        task = label,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "finished"
    );
    out
}

pub fn log_progress(done: usize, total: usize) {
    if done % PROGRESS_EVERY == 0 || done == total {
        tracing::info!(done, total, "progress");
    }
}
