//! Project CRUD.

use super::{Database, SetClause, date_value, now_ms, nullable};
use crate::types::{NewProject, Project, ProjectFilter, ProjectStatus, ProjectUpdate};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

pub fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        github_url: row.get("github_url")?,
        start_date: row.get("start_date")?,
        target_end_date: row.get("target_end_date")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Database {
    /// Insert a project. The input is stored as given; defaults are applied by the caller.
    pub fn insert_project(&self, user_id: Option<i64>, project: &NewProject) -> Result<i64> {
        let now = now_ms();
        let status = project.status.unwrap_or_default();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (
                    user_id, name, description, github_url, start_date, target_end_date,
                    status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user_id,
                    &project.name,
                    &project.description,
                    &project.github_url,
                    project.start_date,
                    project.target_end_date,
                    status,
                    now,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_project(&self, project_id: i64) -> Result<Option<Project>> {
        self.with_conn(|conn| {
            let project = conn
                .query_row(
                    "SELECT * FROM projects WHERE id = ?1",
                    params![project_id],
                    parse_project_row,
                )
                .optional()?;
            Ok(project)
        })
    }

    /// List projects matching every given filter, newest first.
    pub fn list_projects(&self, filter: ProjectFilter) -> Result<Vec<Project>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(user_id) = filter.user_id {
            values.push(Value::Integer(user_id));
            conditions.push(format!("user_id = ?{}", values.len()));
        }
        if let Some(status) = filter.status {
            values.push(Value::Text(status.as_str().to_string()));
            conditions.push(format!("status = ?{}", values.len()));
        }

        let mut sql = String::from("SELECT * FROM projects");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let projects = stmt
                .query_map(params_from_iter(values.iter()), parse_project_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
    }

    /// Apply a sparse update. Returns false if nothing was given or no row matched.
    pub fn update_project(&self, project_id: i64, update: &ProjectUpdate) -> Result<bool> {
        let mut set = SetClause::default();
        if let Some(ref name) = update.name {
            set.set("name", name.clone());
        }
        if let Some(ref description) = update.description {
            set.set("description", nullable(description.clone()));
        }
        if let Some(ref github_url) = update.github_url {
            set.set("github_url", nullable(github_url.clone()));
        }
        if let Some(start_date) = update.start_date {
            set.set("start_date", date_value(start_date));
        }
        if let Some(target_end_date) = update.target_end_date {
            set.set("target_end_date", date_value(target_end_date));
        }
        if let Some(status) = update.status {
            set.set("status", status.as_str().to_string());
        }
        if set.is_empty() {
            return Ok(false);
        }
        set.set("updated_at", now_ms());

        let (sql, values) = set.into_statement("projects", "id", project_id);
        self.with_conn(|conn| {
            let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
            Ok(rows > 0)
        })
    }

    /// Delete a project; tasks, milestones and the retrospective go with it.
    pub fn delete_project(&self, project_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
            Ok(rows > 0)
        })
    }

    /// Number of projects per status for one owner.
    pub fn count_projects_by_status(&self, user_id: i64) -> Result<Vec<(ProjectStatus, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM projects WHERE user_id = ?1 GROUP BY status",
            )?;
            let counts = stmt
                .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(counts)
        })
    }
}
