//! Project milestones.

use super::{Database, SetClause, date_value, now_ms, nullable};
use crate::types::{Milestone, MilestoneUpdate, NewMilestone};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

fn parse_milestone_row(row: &Row) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        target_date: row.get("target_date")?,
        is_completed: row.get("is_completed")?,
        completed_at: row.get("completed_at")?,
    })
}

impl Database {
    pub fn insert_milestone(&self, project_id: i64, milestone: &NewMilestone) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO milestones (project_id, title, description, target_date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    project_id,
                    &milestone.title,
                    &milestone.description,
                    milestone.target_date,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_milestone(&self, milestone_id: i64) -> Result<Option<Milestone>> {
        self.with_conn(|conn| {
            let milestone = conn
                .query_row(
                    "SELECT * FROM milestones WHERE id = ?1",
                    params![milestone_id],
                    parse_milestone_row,
                )
                .optional()?;
            Ok(milestone)
        })
    }

    /// Milestones of a project, earliest target date first.
    pub fn list_milestones(&self, project_id: i64) -> Result<Vec<Milestone>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM milestones
                 WHERE project_id = ?1
                 ORDER BY target_date IS NULL, target_date ASC, id ASC",
            )?;
            let milestones = stmt
                .query_map(params![project_id], parse_milestone_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(milestones)
        })
    }

    pub fn update_milestone(&self, milestone_id: i64, update: &MilestoneUpdate) -> Result<bool> {
        let mut set = SetClause::default();
        if let Some(ref title) = update.title {
            set.set("title", title.clone());
        }
        if let Some(ref description) = update.description {
            set.set("description", nullable(description.clone()));
        }
        if let Some(target_date) = update.target_date {
            set.set("target_date", date_value(Some(target_date)));
        }
        if set.is_empty() {
            return Ok(false);
        }

        let (sql, values) = set.into_statement("milestones", "id", milestone_id);
        self.with_conn(|conn| {
            let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
            Ok(rows > 0)
        })
    }

    /// Flip the completion flag; completing stamps completed_at, reopening clears it.
    pub fn set_milestone_completed(&self, milestone_id: i64, is_completed: bool) -> Result<bool> {
        let completed_at = is_completed.then(now_ms);
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE milestones SET is_completed = ?1, completed_at = ?2 WHERE id = ?3",
                params![is_completed, completed_at, milestone_id],
            )?;
            Ok(rows > 0)
        })
    }

    pub fn delete_milestone(&self, milestone_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM milestones WHERE id = ?1", params![milestone_id])?;
            Ok(rows > 0)
        })
    }
}
