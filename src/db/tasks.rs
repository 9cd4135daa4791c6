//! Task CRUD and status transitions.

use super::{Database, SetClause, date_value, now_ms, nullable};
use crate::types::{NewTask, Task, TaskStatus, TaskUpdate};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

/// Stamps started_at on the first entry into in_progress.
const STAMP_STARTED: &str =
    "started_at = CASE WHEN started_at IS NULL THEN {p} ELSE started_at END";

/// Stamps completed_at when entering done from another status. SET expressions
/// see the row as it was before the update, so `status` is the old status here.
const STAMP_COMPLETED: &str =
    "completed_at = CASE WHEN status = 'done' AND completed_at IS NOT NULL THEN completed_at ELSE {p} END";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: row.get("status")?,
        priority: row.get("priority")?,
        tags: row.get("tags")?,
        estimated_hours: row.get("estimated_hours")?,
        due_date: row.get("due_date")?,
        created_at: row.get("created_at")?,
        started_at: row.get("started_at")?,
        completed_at: row.get("completed_at")?,
    })
}

/// Add the status column plus its timestamp side effects to an update.
fn push_status(set: &mut SetClause, status: TaskStatus, now: i64) {
    set.set("status", status.as_str().to_string());
    match status {
        TaskStatus::InProgress => set.set_expr(STAMP_STARTED, now),
        TaskStatus::Done => set.set_expr(STAMP_COMPLETED, now),
        TaskStatus::Todo => {}
    }
}

impl Database {
    /// Insert a task. A task created in progress or done gets the timestamp a
    /// transition into that status would have set.
    pub fn insert_task(&self, project_id: i64, task: &NewTask) -> Result<i64> {
        let now = now_ms();
        let started_at = (task.status == TaskStatus::InProgress).then_some(now);
        let completed_at = (task.status == TaskStatus::Done).then_some(now);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    project_id, title, description, status, priority, tags,
                    estimated_hours, due_date, created_at, started_at, completed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    project_id,
                    &task.title,
                    &task.description,
                    task.status,
                    task.priority,
                    &task.tags,
                    task.estimated_hours,
                    task.due_date,
                    now,
                    started_at,
                    completed_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row(
                    "SELECT * FROM tasks WHERE id = ?1",
                    params![task_id],
                    parse_task_row,
                )
                .optional()?;
            Ok(task)
        })
    }

    /// Tasks of a project, optionally limited to one status, newest first.
    pub fn list_tasks(&self, project_id: i64, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let tasks = match status {
                Some(status) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM tasks
                         WHERE project_id = ?1 AND status = ?2
                         ORDER BY created_at DESC, id DESC",
                    )?;
                    stmt.query_map(params![project_id, status], parse_task_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM tasks
                         WHERE project_id = ?1
                         ORDER BY created_at DESC, id DESC",
                    )?;
                    stmt.query_map(params![project_id], parse_task_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(tasks)
        })
    }

    pub fn count_tasks(&self, project_id: i64, status: Option<TaskStatus>) -> Result<i64> {
        self.with_conn(|conn| {
            let count = match status {
                Some(status) => conn.query_row(
                    "SELECT COUNT(*) FROM tasks WHERE project_id = ?1 AND status = ?2",
                    params![project_id, status],
                    |row| row.get(0),
                )?,
                None => conn.query_row(
                    "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
                    params![project_id],
                    |row| row.get(0),
                )?,
            };
            Ok(count)
        })
    }

    /// Apply a sparse update. A status change carries the same timestamp
    /// side effects as [`Database::set_task_status`].
    pub fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<bool> {
        let now = now_ms();
        let mut set = SetClause::default();
        if let Some(ref title) = update.title {
            set.set("title", title.clone());
        }
        if let Some(ref description) = update.description {
            set.set("description", nullable(description.clone()));
        }
        if let Some(priority) = update.priority {
            set.set("priority", priority.as_str().to_string());
        }
        if let Some(ref tags) = update.tags {
            set.set("tags", nullable(tags.clone()));
        }
        if let Some(estimated_hours) = update.estimated_hours {
            set.set("estimated_hours", nullable(estimated_hours));
        }
        if let Some(due_date) = update.due_date {
            set.set("due_date", date_value(due_date));
        }
        if let Some(status) = update.status {
            push_status(&mut set, status, now);
        }
        if set.is_empty() {
            return Ok(false);
        }

        let (sql, values) = set.into_statement("tasks", "id", task_id);
        self.with_conn(|conn| {
            let rows = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
            Ok(rows > 0)
        })
    }

    /// Move a task to a new status.
    ///
    /// started_at is set on the first move into in_progress; completed_at is set
    /// on a move into done from another status. Neither is cleared on a move back.
    pub fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<bool> {
        let mut set = SetClause::default();
        push_status(&mut set, status, now_ms());

        let (sql, values) = set.into_statement("tasks", "id", task_id);
        self.with_conn(|conn| {
            let rows = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
            Ok(rows > 0)
        })
    }

    /// Delete a task and its checklist.
    pub fn delete_task(&self, task_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(rows > 0)
        })
    }
}
