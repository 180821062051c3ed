use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::Store;
use super::types::{ResultId, RunResult, RunStatus, StoredResult, TaskConfig};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS results (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time    INTEGER NOT NULL,
    end_time      INTEGER NOT NULL,
    run_time      REAL    NOT NULL,
    status        TEXT    NOT NULL,
    magic_word    TEXT    NOT NULL,
    occurrence    INTEGER NOT NULL,
    files         TEXT    NOT NULL,
    new_files     TEXT    NOT NULL,
    removed_files TEXT    NOT NULL,
    error         TEXT    NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_results_start_time ON results(start_time DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_results_status_end_time ON results(status, end_time DESC);
CREATE TABLE IF NOT EXISTS task_config (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    interval   REAL    NOT NULL,
    magic_word TEXT    NOT NULL,
    updated_at INTEGER NOT NULL
);";

const RESULT_COLUMNS: &str = "id, start_time, end_time, run_time, status, magic_word, occurrence, \
                              files, new_files, removed_files, error";

/// SQLite-backed store. The task configuration lives in a single row that is
/// replaced in place; run records get one row each.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Raw column values, decoded outside the rusqlite row callback
struct ResultRow {
    id: i64,
    start_time: i64,
    end_time: i64,
    run_time: f64,
    status: String,
    magic_word: String,
    occurrence: i64,
    files: String,
    new_files: String,
    removed_files: String,
    error: String,
}

impl ResultRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            run_time: row.get(3)?,
            status: row.get(4)?,
            magic_word: row.get(5)?,
            occurrence: row.get(6)?,
            files: row.get(7)?,
            new_files: row.get(8)?,
            removed_files: row.get(9)?,
            error: row.get(10)?,
        })
    }

    fn decode(self) -> Result<StoredResult> {
        Ok(StoredResult {
            id: ResultId(self.id),
            result: RunResult {
                start_time: self.start_time,
                end_time: self.end_time,
                run_time: self.run_time,
                status: self.status.parse()?,
                magic_word: self.magic_word,
                occurrence: u64::try_from(self.occurrence)
                    .with_context(|| format!("Negative occurrence in result {}", self.id))?,
                files: decode_paths(&self.files, self.id)?,
                new_files: decode_paths(&self.new_files, self.id)?,
                removed_files: decode_paths(&self.removed_files, self.id)?,
                error: self.error,
            },
        })
    }
}

fn decode_paths(raw: &str, id: i64) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("Corrupt file list in result {}", id))
}

fn encode_paths(paths: &[String]) -> Result<String> {
    serde_json::to_string(paths).context("Failed to encode file list")
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .context("Failed to set database pragmas")?;
        debug!("Opened result store at {}", path.display());
        Self::with_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create database schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    fn query_results(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<StoredResult>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .context("Failed to prepare result query")?;
        let rows = stmt
            .query_map(params, ResultRow::from_row)
            .context("Failed to query results")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read result rows")?;
        rows.into_iter().map(ResultRow::decode).collect()
    }
}

impl Store for SqliteStore {
    fn task_config(&self, defaults: &TaskConfig) -> Result<TaskConfig> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO task_config (id, interval, magic_word, updated_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO NOTHING",
            params![
                defaults.interval,
                defaults.magic_word,
                chrono::Utc::now().timestamp()
            ],
        )
        .context("Failed to initialise task configuration")?;
        conn.query_row(
            "SELECT interval, magic_word FROM task_config WHERE id = 1",
            [],
            |row| {
                Ok(TaskConfig {
                    interval: row.get(0)?,
                    magic_word: row.get(1)?,
                })
            },
        )
        .context("Failed to read task configuration")
    }

    fn put_task_config(&self, config: &TaskConfig) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO task_config (id, interval, magic_word, updated_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                interval = excluded.interval,
                magic_word = excluded.magic_word,
                updated_at = excluded.updated_at",
            params![
                config.interval,
                config.magic_word,
                chrono::Utc::now().timestamp()
            ],
        )
        .context("Failed to store task configuration")?;
        Ok(())
    }

    fn append_result(&self, result: &RunResult) -> Result<ResultId> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO results (start_time, end_time, run_time, status, magic_word, occurrence,
                                  files, new_files, removed_files, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                result.start_time,
                result.end_time,
                result.run_time,
                result.status.as_str(),
                result.magic_word,
                i64::try_from(result.occurrence).context("Occurrence count overflows storage")?,
                encode_paths(&result.files)?,
                encode_paths(&result.new_files)?,
                encode_paths(&result.removed_files)?,
                result.error,
            ],
        )
        .context("Failed to append result")?;
        Ok(ResultId(conn.last_insert_rowid()))
    }

    fn update_result(&self, id: ResultId, result: &RunResult) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE results SET
                    start_time = ?2, end_time = ?3, run_time = ?4, status = ?5, magic_word = ?6,
                    occurrence = ?7, files = ?8, new_files = ?9, removed_files = ?10, error = ?11
                 WHERE id = ?1",
                params![
                    id.0,
                    result.start_time,
                    result.end_time,
                    result.run_time,
                    result.status.as_str(),
                    result.magic_word,
                    i64::try_from(result.occurrence)
                        .context("Occurrence count overflows storage")?,
                    encode_paths(&result.files)?,
                    encode_paths(&result.new_files)?,
                    encode_paths(&result.removed_files)?,
                    result.error,
                ],
            )
            .with_context(|| format!("Failed to update result {}", id))?;
        if changed == 0 {
            anyhow::bail!("No result with id {}", id);
        }
        Ok(())
    }

    fn last_result(&self) -> Result<Option<RunResult>> {
        let row = {
            let conn = self.lock()?;
            conn.query_row(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM results WHERE status = ?1
                     ORDER BY end_time DESC, id DESC LIMIT 1"
                ),
                params![RunStatus::Success.as_str()],
                ResultRow::from_row,
            )
            .optional()
            .context("Failed to read last result")?
        };
        row.map(|row| row.decode().map(|stored| stored.result))
            .transpose()
    }

    fn results(&self, page: usize, size: usize) -> Result<Vec<StoredResult>> {
        let limit = i64::try_from(size).context("Page size too large")?;
        let offset = i64::try_from(page.saturating_mul(size)).context("Page too large")?;
        self.query_results(
            &format!(
                "SELECT {RESULT_COLUMNS} FROM results
                 ORDER BY start_time DESC, id DESC LIMIT ?1 OFFSET ?2"
            ),
            params![limit, offset],
        )
    }

    fn running_results(&self) -> Result<Vec<StoredResult>> {
        self.query_results(
            &format!("SELECT {RESULT_COLUMNS} FROM results WHERE status = ?1 ORDER BY id ASC"),
            params![RunStatus::Running.as_str()],
        )
    }
}
