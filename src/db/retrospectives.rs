//! Project retrospectives (at most one per project).

use super::{Database, now_ms};
use crate::types::{Retrospective, RetrospectiveInput, RetrospectiveSummary};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

fn parse_retrospective_row(row: &Row) -> rusqlite::Result<Retrospective> {
    Ok(Retrospective {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        keep_content: row.get("keep_content")?,
        problem_content: row.get("problem_content")?,
        try_content: row.get("try_content")?,
        learning_content: row.get("learning_content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Database {
    /// Insert the retrospective of a project. Fails on the UNIQUE constraint
    /// if the project already has one.
    pub fn insert_retrospective(&self, project_id: i64, input: &RetrospectiveInput) -> Result<i64> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO retrospectives (
                    project_id, keep_content, problem_content, try_content, learning_content,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    project_id,
                    &input.keep_content,
                    &input.problem_content,
                    &input.try_content,
                    &input.learning_content,
                    now,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_retrospective(&self, project_id: i64) -> Result<Option<Retrospective>> {
        self.with_conn(|conn| {
            let retrospective = conn
                .query_row(
                    "SELECT * FROM retrospectives WHERE project_id = ?1",
                    params![project_id],
                    parse_retrospective_row,
                )
                .optional()?;
            Ok(retrospective)
        })
    }

    /// Overwrite all four fields of a project's retrospective.
    pub fn update_retrospective(&self, project_id: i64, input: &RetrospectiveInput) -> Result<bool> {
        let now = now_ms();
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE retrospectives
                 SET keep_content = ?1, problem_content = ?2, try_content = ?3,
                     learning_content = ?4, updated_at = ?5
                 WHERE project_id = ?6",
                params![
                    &input.keep_content,
                    &input.problem_content,
                    &input.try_content,
                    &input.learning_content,
                    now,
                    project_id,
                ],
            )?;
            Ok(rows > 0)
        })
    }

    /// Every retrospective with its project's name, newest first.
    pub fn list_retrospectives(&self, user_id: Option<i64>) -> Result<Vec<RetrospectiveSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.*, p.name AS project_name
                 FROM retrospectives r
                 JOIN projects p ON r.project_id = p.id
                 WHERE ?1 IS NULL OR p.user_id = ?1
                 ORDER BY r.created_at DESC, r.id DESC",
            )?;
            let summaries = stmt
                .query_map(params![user_id], |row| {
                    Ok(RetrospectiveSummary {
                        retrospective: parse_retrospective_row(row)?,
                        project_name: row.get("project_name")?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(summaries)
        })
    }
}
