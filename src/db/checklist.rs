//! Checklist items attached to tasks.

use super::{Database, now_ms};
use crate::types::ChecklistItem;
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

fn parse_item_row(row: &Row) -> rusqlite::Result<ChecklistItem> {
    Ok(ChecklistItem {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        content: row.get("content")?,
        is_checked: row.get("is_checked")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    pub fn insert_checklist_item(&self, task_id: i64, content: &str, is_checked: bool) -> Result<i64> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO checklist_items (task_id, content, is_checked, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![task_id, content, is_checked, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Items of a task in the order they were added.
    pub fn list_checklist_items(&self, task_id: i64) -> Result<Vec<ChecklistItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM checklist_items WHERE task_id = ?1 ORDER BY created_at, id",
            )?;
            let items = stmt
                .query_map(params![task_id], parse_item_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
    }

    pub fn set_checklist_item_checked(&self, item_id: i64, is_checked: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE checklist_items SET is_checked = ?1 WHERE id = ?2",
                params![is_checked, item_id],
            )?;
            Ok(rows > 0)
        })
    }

    /// Task that owns an item, if the item exists.
    pub fn checklist_item_task(&self, item_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let task_id = conn
                .query_row(
                    "SELECT task_id FROM checklist_items WHERE id = ?1",
                    params![item_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(task_id)
        })
    }

    pub fn delete_checklist_item(&self, item_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM checklist_items WHERE id = ?1", params![item_id])?;
            Ok(rows > 0)
        })
    }
}
