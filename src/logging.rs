use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter: engine events at info, dependencies at warn. The
/// per-event training diagnostics (replay under-fill, divergence rollbacks)
/// are debug level in the agent and stay silent unless
/// `ENGINE_TRACE_TRAINING` opts in.
const DEFAULT_FILTER: &str = "warn,tutor_engine=info";
const TRAINING_DIRECTIVE: &str = "tutor_engine::engine::agent=debug";

pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn file_logging_enabled() -> bool {
    env_flag("ENGINE_FILE_LOGS")
}

pub fn trace_training_enabled() -> bool {
    env_flag("ENGINE_TRACE_TRAINING")
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Builds the engine's env filter. An explicit `log_level` wins, then
/// `RUST_LOG`, then the engine default; unparseable directives fall back to
/// the default rather than failing startup.
pub fn build_filter(log_level: Option<&str>) -> EnvFilter {
    let base = log_level
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());

    let spec = if trace_training_enabled() {
        format!("{base},{TRAINING_DIRECTIVE}")
    } else {
        base
    };

    EnvFilter::try_new(&spec).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the tracing subscriber for a process embedding the engine:
/// stdout always, plus a daily-rolling file when `ENGINE_FILE_LOGS` is set.
/// Safe to call when a subscriber is already installed (the call becomes a
/// no-op). The returned guard must be held for the process lifetime to keep
/// the file writer flushing.
pub fn init_tracing(log_level: Option<&str>) -> Option<FileLogGuard> {
    let env_filter = build_filter(log_level);
    let stdout_layer = fmt::layer().with_target(true);

    if file_logging_enabled() {
        let log_dir = std::env::var("ENGINE_LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
        if let Err(err) = std::fs::create_dir_all(&log_dir) {
            eprintln!("failed to create log directory {log_dir}: {err}");
        } else {
            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &log_dir, "tutor-engine.log");
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);

            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init();

            return Some(FileLogGuard { _guard: guard });
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init();

    None
}
