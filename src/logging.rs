//! logging.rs — Structured logging for the recap service, backed by `tracing`.
//!
//! A global subscriber is installed once: colored stderr plus, for the
//! server, a daily-rotated file under the platform data directory. The
//! `backend_*` helpers keep pipeline call-sites short.

use std::path::PathBuf;
use std::sync::{Once, OnceLock};

use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT_LOGGING: Once = Once::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub const LOG_LEVEL_ENV: &str = "DEPOT_RECAP_LOG_LEVEL";

pub fn resolve_log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("depot-recap")
        .join("logs")
}

fn build_file_appender() -> Option<(RollingFileAppender, PathBuf)> {
    let log_dir = resolve_log_dir();
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "[depot-recap][WARN] Failed to create log directory {}: {}",
            log_dir.display(),
            err
        );
        return None;
    }

    Some((RollingFileAppender::new(Rotation::DAILY, &log_dir, "depot-recap.log"), log_dir))
}

/// Install the global subscriber. `with_file` is off for one-shot CLI
/// commands so that `ask` does not leave log files behind.
pub fn init_logging(with_file: bool) {
    INIT_LOGGING.call_once(|| {
        let (file_layer, log_dir_description) = match with_file.then(build_file_appender).flatten() {
            Some((appender, dir)) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(non_blocking);
                LOG_GUARD.set(guard).ok();
                (Some(layer), Some(dir))
            }
            None => (None, None),
        };

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".into())))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let stdout_layer = fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .with_timer(UtcTime::rfc_3339());

        let registry = tracing_subscriber::registry().with(filter).with(stdout_layer);
        if let Some(file_layer) = file_layer {
            registry.with(file_layer).init();
        } else {
            registry.init();
        }

        match log_dir_description {
            Some(dir) => backend_info(format!(
                "Structured logging initialized. Logs will be rotated daily under {}",
                dir.display()
            )),
            None if with_file => {
                backend_warn("Structured logging initialized without file sink (using stderr only)")
            }
            None => {}
        }
    });
}

pub fn backend_info(message: impl AsRef<str>) {
    info!(target: "depot_recap", "{}", message.as_ref());
}

pub fn backend_warn(message: impl AsRef<str>) {
    warn!(target: "depot_recap", "{}", message.as_ref());
}

pub fn backend_error(message: impl AsRef<str>) {
    error!(target: "depot_recap", "{}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_is_app_scoped() {
        let dir = resolve_log_dir();
        assert!(dir.ends_with("depot-recap/logs"));
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging(false);
        init_logging(false);
        backend_info("logging initialized twice without panicking");
    }
}
