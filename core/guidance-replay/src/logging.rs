//! Subscriber setup for the replay binary.
//!
//! Logs go to stderr so stdout stays a clean stream of snapshot lines.
//! `SMOKEARROW_LOG_DIR` redirects them to a daily rolling file instead.

use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "guidance-replay";

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered file output is lost.
pub fn init() -> Option<WorkerGuard> {
    let filter = env_filter();

    let Some(dir) = env::var_os("SMOKEARROW_LOG_DIR") else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return None;
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&dir);

    match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(err) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(
                dir = %dir.to_string_lossy(),
                error = %err,
                "Log directory unusable; logging to stderr"
            );
            None
        }
    }
}

fn env_filter() -> EnvFilter {
    let debug_enabled = env::var("SMOKEARROW_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
