// src/store/store.rs — SQLite operations

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Low-level SQLite operations for users, tasks and session records.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // -- Users --

    pub fn insert_user(&self, username: &str, password_hash: &str) -> anyhow::Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<UserRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                UserRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn find_user(&self, id: i64) -> anyhow::Result<Option<UserRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
                params![id],
                UserRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    // -- Login sessions --

    pub fn insert_login_session(
        &self,
        token: &str,
        user_id: i64,
        csrf_token: &str,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO login_sessions (token, user_id, csrf_token, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![token, user_id, csrf_token, now],
        )?;
        Ok(())
    }

    pub fn find_login_session(&self, token: &str) -> anyhow::Result<Option<LoginSessionRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT s.token, s.user_id, u.username, s.csrf_token
                 FROM login_sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token],
                |row| {
                    Ok(LoginSessionRow {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        csrf_token: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn delete_login_session(&self, token: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "DELETE FROM login_sessions WHERE token = ?1",
            params![token],
        )?;
        Ok(())
    }

    // -- Tasks --

    pub fn insert_task(&self, user_id: i64, task: &NewTask) -> anyhow::Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO tasks (user_id, title, description, priority, deadline, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                task.title,
                task.description,
                task.priority.as_str(),
                task.deadline.map(|d| d.to_string()),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// A task, only if it belongs to `user_id`.
    pub fn find_task(&self, user_id: i64, task_id: i64) -> anyhow::Result<Option<TaskRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, title, description, priority, deadline, completed, created_at
                 FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
                TaskRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Incomplete tasks: earliest deadline first (none last), then by priority.
    pub fn pending_tasks(&self, user_id: i64) -> anyhow::Result<Vec<TaskRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, description, priority, deadline, completed, created_at
             FROM tasks
             WHERE user_id = ?1 AND completed = 0
             ORDER BY deadline IS NULL, deadline ASC,
                      CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
                      id ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id], TaskRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Flip completion. Returns the new state, or None if not the user's task.
    pub fn toggle_task(&self, user_id: i64, task_id: i64) -> anyhow::Result<Option<bool>> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = 1 - completed WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let completed: bool = self.conn.query_row(
            "SELECT completed FROM tasks WHERE id = ?1",
            params![task_id],
            |r| r.get(0),
        )?;
        Ok(Some(completed))
    }

    pub fn task_counts(&self, user_id: i64) -> anyhow::Result<TaskCounts> {
        let (total, completed): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks WHERE user_id = ?1",
            params![user_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(TaskCounts {
            total: total as u32,
            completed: completed as u32,
        })
    }

    /// Completed tasks created on `day` (UTC); tasks carry no completion time.
    pub fn tasks_completed_on(&self, user_id: i64, day: NaiveDate) -> anyhow::Result<u32> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE user_id = ?1 AND completed = 1 AND substr(created_at, 1, 10) = ?2",
            params![user_id, day.to_string()],
            |r| r.get(0),
        )?;
        Ok(n as u32)
    }

    // -- Session records --

    pub fn insert_pomodoro(
        &self,
        user_id: i64,
        task_id: Option<i64>,
        duration: u32,
        started_at: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        self.conn.execute(
            "INSERT INTO pomodoros (user_id, task_id, duration, completed, started_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![user_id, task_id, duration, started_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Set `completed` on a record owned by `user_id`. Repeating it is a no-op.
    /// Returns false when no such record exists for that user.
    pub fn complete_pomodoro(&self, user_id: i64, id: i64) -> anyhow::Result<bool> {
        let matched = self.conn.execute(
            "UPDATE pomodoros SET completed = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(matched > 0)
    }

    pub fn get_pomodoro(&self, id: i64) -> anyhow::Result<Option<PomodoroRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, task_id, duration, completed, started_at
                 FROM pomodoros WHERE id = ?1",
                params![id],
                PomodoroRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Completed records whose start date (UTC) is on or after `since`.
    pub fn completed_pomodoros_since(
        &self,
        user_id: i64,
        since: NaiveDate,
    ) -> anyhow::Result<Vec<PomodoroRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, task_id, duration, completed, started_at
             FROM pomodoros
             WHERE user_id = ?1 AND completed = 1 AND substr(started_at, 1, 10) >= ?2
             ORDER BY started_at ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id, since.to_string()], PomodoroRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// -- Row types --

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoginSessionRow {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let priority: String = row.get(4)?;
        let deadline: Option<String> = row.get(5)?;
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            priority: Priority::parse(&priority).unwrap_or_default(),
            deadline: deadline.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            completed: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PomodoroRow {
    pub id: i64,
    pub user_id: i64,
    pub task_id: Option<i64>,
    pub duration: u32,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
}

impl PomodoroRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let started: String = row.get(5)?;
        let started_at = DateTime::parse_from_rfc3339(&started)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?;
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            task_id: row.get(2)?,
            duration: row.get(3)?,
            completed: row.get(4)?,
            started_at,
        })
    }
}
