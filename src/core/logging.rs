//! Logging Initialization
//!
//! Structured logs go to a daily rolling JSON file under the app data
//! directory. Standard `log` macros are bridged into `tracing`, and rolled
//! files from earlier days are gzipped in the background.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::AppConfig;

const LOG_FILE_PREFIX: &str = "bioforge.log";

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Initialize logging with a stdout layer in addition to the file.
///
/// Returns a `WorkerGuard` that must be kept alive until shutdown so
/// buffered lines are flushed.
pub fn init() -> WorkerGuard {
    let log_dir = AppConfig::log_dir();
    let (file_layer, guard) = file_layer(&log_dir);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .pretty()
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();
    bridge_log_crate();
    spawn_compression(log_dir.clone());

    log::info!(
        "Logging initialized. Writing to: {:?} (daily rolling)",
        log_dir.join(LOG_FILE_PREFIX)
    );
    guard
}

/// Initialize logging for TUI mode.
///
/// Same as [`init()`] without the stdout layer, since ratatui owns the
/// terminal while the app runs.
pub fn init_tui() -> WorkerGuard {
    let log_dir = AppConfig::log_dir();
    let (file_layer, guard) = file_layer(&log_dir);

    tracing_subscriber::registry().with(file_layer).init();
    bridge_log_crate();
    spawn_compression(log_dir);

    guard
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn file_layer<S>(log_dir: &Path) -> (impl Layer<S>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to create logs directory {}: {}", log_dir.display(), e);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(env_filter());

    (layer, guard)
}

/// Route `log` macros into `tracing`. The subscriber may already have done
/// this, in which case the second install is a no-op.
fn bridge_log_crate() {
    if tracing_log::LogTracer::init().is_err() {
        tracing::debug!("log bridge already installed");
    }
}

fn spawn_compression(log_dir: PathBuf) {
    std::thread::spawn(move || compress_old_logs(&log_dir));
}

// ============================================================================
// Log Compression
// ============================================================================

/// Whether a file in the log dir is a rolled log from a previous day.
fn should_compress(name: &str, today_suffix: &str) -> bool {
    name.starts_with(&format!("{LOG_FILE_PREFIX}."))
        && !name.ends_with(today_suffix)
        && !name.ends_with(".gz")
}

fn compress_old_logs(log_dir: &Path) {
    let today_suffix = chrono::Local::now().format("%Y-%m-%d").to_string();

    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };

    for path in entries.flatten().map(|e| e.path()) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !should_compress(name, &today_suffix) {
            continue;
        }
        match compress_file(&path) {
            Ok(()) => log::info!("Compressed old log: {:?}", path),
            Err(e) => log::warn!("Failed to compress old log {:?}: {}", path, e),
        }
    }
}

fn compress_file(path: &Path) -> io::Result<()> {
    let mut gz_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No filename"))?
        .to_os_string();
    gz_name.push(".gz");
    let gz_path = path.with_file_name(gz_name);

    if gz_path.exists() {
        return Ok(());
    }

    let mut reader = io::BufReader::new(fs::File::open(path)?);
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path)?, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
}
