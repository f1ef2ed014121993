mod controller;
mod db;
mod errors;
mod models;
mod reconcile;
mod summarizer;

pub use controller::{today, AppController, ControllerEvent, Surface, PLACEHOLDER_TASK_TEXT};
pub use db::Database;
pub use errors::{AppError, AppResult};
pub use models::{AppSettings, TaskRecord};
pub use reconcile::{current_task_index, display_order, reorder, toggle_done, toggle_pinned};
pub use summarizer::{parse_tasks, SummarizeOutcome, Summarizer};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Sets up daily-rolling JSON logs under `<data_dir>/logs`. The embedding
/// shell calls this once, before constructing the controller.
pub fn init_tracing(data_dir: &Path) -> AppResult<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "daytask.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))
}
