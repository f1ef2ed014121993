//! Wires the two UI surfaces to the store and the summarizer. The
//! controller never holds a task list of its own: surfaces own their
//! copies, and every hand-off (publish, toggle results, startup load) is by
//! value. Surface lifecycle is explicit flag bookkeeping; the process quits
//! only when both surfaces have closed.

use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, TaskRecord};
use crate::reconcile;
use crate::summarizer::{SummarizeOutcome, Summarizer};
use chrono::{Local, NaiveDate};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Seeds the display surface when a day has no stored tasks yet. Never
/// persisted: an untouched day stays empty in the store.
pub const PLACEHOLDER_TASK_TEXT: &str =
    "Today's tasks are empty. Open the editor to add some";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Display,
    Editor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// The display surface must replace its copy wholesale and re-raise
    /// itself so the user sees the publish take effect.
    TasksPublished(Vec<TaskRecord>),
    /// A publish happened while the display surface was closed; the shell
    /// should re-open it.
    DisplayRequested,
    /// Both surfaces are closed; the shell should exit.
    QuitRequested,
}

#[derive(Debug, Default)]
struct SurfaceFlags {
    display_open: bool,
    editor_open: bool,
}

pub struct AppController {
    db: Arc<Database>,
    summarizer: Summarizer,
    flags: Mutex<SurfaceFlags>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

/// The day key surfaces normally operate on.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl AppController {
    pub fn new(
        data_dir: &Path,
        legacy_archive_dir: Option<&Path>,
    ) -> AppResult<(Arc<Self>, mpsc::UnboundedReceiver<ControllerEvent>)> {
        let db = Arc::new(Database::open(data_dir, legacy_archive_dir)?);
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Arc::new(Self {
            db,
            summarizer: Summarizer::new(),
            flags: Mutex::new(SurfaceFlags::default()),
            events,
        });
        Ok((controller, receiver))
    }

    /// The list a freshly opened display surface should show: the stored
    /// list for `day`, or a single pinned placeholder when the day is empty.
    pub fn startup_tasks(&self, day: NaiveDate) -> AppResult<Vec<TaskRecord>> {
        let stored = self.db.load_tasks(day)?;
        if !stored.is_empty() {
            return Ok(stored);
        }
        Ok(vec![TaskRecord {
            text: PLACEHOLDER_TASK_TEXT.to_string(),
            done: false,
            pinned: true,
        }])
    }

    /// The publish path: persist the editor's list for `day`, then push a
    /// copy to the display surface. On a storage fault nothing is emitted
    /// and the caller still holds the unsaved list for a retry.
    pub fn publish(&self, day: NaiveDate, tasks: &[TaskRecord]) -> AppResult<()> {
        if tasks.is_empty() {
            return Err(AppError::Validation(
                "nothing to publish: the task list is empty".to_string(),
            ));
        }

        self.db.save_tasks(day, tasks)?;

        {
            let mut flags = self.lock_flags()?;
            if !flags.display_open {
                flags.display_open = true;
                self.send(ControllerEvent::DisplayRequested);
            }
        }
        self.send(ControllerEvent::TasksPublished(tasks.to_vec()));
        tracing::info!(day = %day, count = tasks.len(), "tasks published");
        Ok(())
    }

    /// Marks the current task (per the reconciliation rule) done and
    /// persists. A list with nothing left to do passes through unchanged.
    pub fn complete_current(
        &self,
        day: NaiveDate,
        tasks: &[TaskRecord],
    ) -> AppResult<Vec<TaskRecord>> {
        let Some(index) = reconcile::current_task_index(tasks) else {
            return Ok(tasks.to_vec());
        };
        let mut next = tasks.to_vec();
        next[index].done = true;
        self.db.save_tasks(day, &next)?;
        Ok(next)
    }

    pub fn toggle_done(
        &self,
        day: NaiveDate,
        tasks: &[TaskRecord],
        index: usize,
    ) -> AppResult<Vec<TaskRecord>> {
        let next = reconcile::toggle_done(tasks, index)?;
        self.db.save_tasks(day, &next)?;
        Ok(next)
    }

    pub fn toggle_pinned(
        &self,
        day: NaiveDate,
        tasks: &[TaskRecord],
        index: usize,
    ) -> AppResult<Vec<TaskRecord>> {
        let next = reconcile::toggle_pinned(tasks, index)?;
        self.db.save_tasks(day, &next)?;
        Ok(next)
    }

    /// Applies a drag-and-drop permutation and persists the new canonical
    /// order.
    pub fn reorder(
        &self,
        day: NaiveDate,
        tasks: &[TaskRecord],
        order: &[usize],
    ) -> AppResult<Vec<TaskRecord>> {
        let next = reconcile::reorder(tasks, order)?;
        self.db.save_tasks(day, &next)?;
        Ok(next)
    }

    /// Runs the summarization adapter against the saved credential. Any
    /// failure leaves every existing task list untouched; the outcome is
    /// returned to the editor, which decides whether to publish it.
    pub async fn summarize(&self, input: &str) -> AppResult<SummarizeOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AppError::Validation(
                "write down some ideas before summarizing".to_string(),
            ));
        }
        let api_key = self.db.load_api_key()?.ok_or_else(|| {
            AppError::Validation("no API key saved; set one before summarizing".to_string())
        })?;
        let settings = self.db.get_settings()?;
        self.summarizer.summarize(&settings, input, &api_key).await
    }

    pub fn set_api_key(&self, value: &str) -> AppResult<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::Validation("the API key must not be empty".to_string()));
        }
        self.db.save_api_key(value)
    }

    pub fn api_key(&self) -> AppResult<Option<String>> {
        self.db.load_api_key()
    }

    pub fn settings(&self) -> AppResult<AppSettings> {
        self.db.get_settings()
    }

    pub fn update_settings(&self, patch: serde_json::Value) -> AppResult<AppSettings> {
        self.db.update_settings(patch)
    }

    pub fn surface_opened(&self, surface: Surface) -> AppResult<()> {
        let mut flags = self.lock_flags()?;
        match surface {
            Surface::Display => flags.display_open = true,
            Surface::Editor => flags.editor_open = true,
        }
        Ok(())
    }

    /// Closing a surface hides it; only the last close asks the shell to
    /// quit.
    pub fn surface_closed(&self, surface: Surface) -> AppResult<()> {
        let should_quit = {
            let mut flags = self.lock_flags()?;
            match surface {
                Surface::Display => flags.display_open = false,
                Surface::Editor => flags.editor_open = false,
            }
            !flags.display_open && !flags.editor_open
        };
        if should_quit {
            self.send(ControllerEvent::QuitRequested);
        }
        Ok(())
    }

    fn send(&self, event: ControllerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("controller event dropped: no shell listening");
        }
    }

    fn lock_flags(&self) -> AppResult<std::sync::MutexGuard<'_, SurfaceFlags>> {
        self.flags
            .lock()
            .map_err(|_| AppError::Internal("surface flags mutex poisoned".to_string()))
    }
}
