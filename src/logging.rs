use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "posta_client.log";

// Kept alive for the whole process so the file writer keeps flushing.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console + daily rolling file. Calling it twice is harmless.
pub fn initialize_logging(log_dir: &Path) {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    if LOG_GUARD.set(guard).is_err() {
        return;
    }

    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stdout)
        .with_filter(filter());

    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_filter(filter());

    if tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("A global subscriber was already installed.");
    }
}
