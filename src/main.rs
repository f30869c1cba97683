//! loctable binary entrypoint: logging setup, then the selected CLI action.

mod args;

use std::fmt;
use std::sync::OnceLock;

use clap::Parser;

struct LoctableTimer;

impl tracing_subscriber::fmt::time::FormatTime for LoctableTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let now = chrono::Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f"))
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// What: Install the global tracing subscriber.
///
/// Inputs:
/// - `level`: Default filter directive when `RUST_LOG` is unset
///
/// Details:
/// - Writes to `~/.config/loctable/logs/loctable.log`; falls back to stderr
///   when the file cannot be opened
fn init_logging(level: &str) {
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };
    let mut log_path = loctable::util::logs_dir();
    log_path.push("loctable.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(LoctableTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            // Fallback: stderr logger so the CLI still runs
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(LoctableTimer)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

#[tokio::main]
async fn main() {
    let args = args::Args::parse();
    init_logging(&args::determine_log_level(&args));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "loctable starting");
    if let Err(err) = args::run(&args).await {
        tracing::error!(error = %err, "command failed");
        eprintln!("loctable: {err}");
        std::process::exit(1);
    }
    tracing::info!("loctable exited");
}
