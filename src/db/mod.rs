use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, TaskRecord};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");
const DB_NAME: &str = "daytask.db";
const LEGACY_KEY_FILE: &str = "apikey.json";

/// Durable store for day-keyed task lists, the single credential slot, and
/// the settings row. Task lists are overwritten wholesale per day; reads
/// that miss the indexed store fall back to one-time migration from the
/// legacy per-day JSON archives.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    archive_candidates: Vec<PathBuf>,
    legacy_key_path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the store under `data_dir`. `legacy_archive_dir`
    /// is an optional extra location probed when migrating flat-file archives;
    /// `data_dir/archive` is always probed first.
    pub fn open(data_dir: &Path, legacy_archive_dir: Option<&Path>) -> AppResult<Self> {
        fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join(DB_NAME))?;
        conn.execute_batch(SCHEMA_SQL)?;

        let mut archive_candidates = vec![data_dir.join("archive")];
        if let Some(dir) = legacy_archive_dir {
            archive_candidates.push(dir.to_path_buf());
        }

        let db = Self {
            conn: Mutex::new(conn),
            archive_candidates,
            legacy_key_path: data_dir.join(LEGACY_KEY_FILE),
        };
        db.ensure_default_settings()?;
        Ok(db)
    }

    /// Returns the stored list for `day`, in position order. A miss in the
    /// indexed store triggers legacy migration; the migrated list is written
    /// through immediately so migration runs at most once per day. No data
    /// anywhere is an empty list, never an error.
    pub fn load_tasks(&self, day: NaiveDate) -> AppResult<Vec<TaskRecord>> {
        let iso = day.to_string();
        let stored = {
            let conn = self.lock_conn()?;
            let mut stmt = conn.prepare(
                "SELECT text, done, pinned FROM tasks WHERE task_date = ?1 ORDER BY position ASC",
            )?;
            let rows = stmt.query_map([&iso], |row| {
                Ok(TaskRecord {
                    text: row.get(0)?,
                    done: row.get(1)?,
                    pinned: row.get(2)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        if !stored.is_empty() {
            return Ok(stored);
        }

        if let Some(migrated) = self.read_legacy_tasks(day) {
            tracing::info!(day = %iso, count = migrated.len(), "migrated legacy task archive");
            self.save_tasks(day, &migrated)?;
            return Ok(migrated);
        }

        Ok(Vec::new())
    }

    /// Replaces the entire entry for `day` with `tasks`, position = index.
    /// Delete-then-insert, never a merge.
    pub fn save_tasks(&self, day: NaiveDate, tasks: &[TaskRecord]) -> AppResult<()> {
        let iso = day.to_string();
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tasks WHERE task_date = ?1", [&iso])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (task_date, position, text, done, pinned)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, task) in tasks.iter().enumerate() {
                stmt.execute(params![iso, position as i64, task.text, task.done, task.pinned])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns the saved credential, trimmed, or `None` when unset. A miss
    /// in the primary slot falls back to the legacy key file and persists
    /// the value forward.
    pub fn load_api_key(&self) -> AppResult<Option<String>> {
        let stored: Option<String> = {
            let conn = self.lock_conn()?;
            conn.query_row("SELECT api_key FROM api_keys WHERE id = 1", [], |row| row.get(0))
                .optional()?
        };

        if let Some(key) = stored {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(Some(key.to_string()));
            }
        }

        match read_legacy_api_key(&self.legacy_key_path) {
            Some(key) => {
                self.save_api_key(&key)?;
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }

    /// Upserts the single credential slot, unconditionally overwriting any
    /// existing value.
    pub fn save_api_key(&self, api_key: &str) -> AppResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO api_keys (id, api_key, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET api_key = excluded.api_key, updated_at = excluded.updated_at",
            params![api_key, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_settings(&self) -> AppResult<AppSettings> {
        let conn = self.lock_conn()?;
        let raw = conn
            .query_row("SELECT value_json FROM settings WHERE key = 'app'", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<AppSettings>(&raw).unwrap_or_default()),
            None => Ok(AppSettings::default()),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings = serde_json::from_value(merged)?;

        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(&settings)?, Utc::now().to_rfc3339()],
        )?;

        Ok(settings)
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let conn = self.lock_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(1) FROM settings WHERE key = 'app'", [], |row| row.get(0))?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES ('app', ?1, ?2)",
                params![
                    serde_json::to_string(&AppSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }

    fn read_legacy_tasks(&self, day: NaiveDate) -> Option<Vec<TaskRecord>> {
        let file_name = format!("{}.json", day);
        for dir in &self.archive_candidates {
            if let Some(tasks) = read_task_archive(&dir.join(&file_name)) {
                if !tasks.is_empty() {
                    return Some(tasks);
                }
            }
        }
        None
    }

    fn lock_conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

/// Legacy archives predate this store's stability guarantees: every way the
/// file can fail to read or parse collapses to "no legacy data". Entries
/// that are not objects or lack a string `text` are skipped; missing flags
/// default to false.
fn read_task_archive(path: &Path) -> Option<Vec<TaskRecord>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %error, "legacy archive unreadable");
            }
            return None;
        }
    };
    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
    let items = value.as_array()?;

    let mut tasks = Vec::new();
    for item in items {
        let Some(object) = item.as_object() else {
            continue;
        };
        let Some(text) = object.get("text").and_then(|value| value.as_str()) else {
            continue;
        };
        tasks.push(TaskRecord {
            text: text.to_string(),
            done: object.get("done").and_then(|value| value.as_bool()).unwrap_or(false),
            pinned: object.get("pinned").and_then(|value| value.as_bool()).unwrap_or(false),
        });
    }
    Some(tasks)
}

fn read_legacy_api_key(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
    let key = value.as_object()?.get("api_key")?.as_str()?.trim();
    if key.is_empty() {
        return None;
    }
    Some(key.to_string())
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
