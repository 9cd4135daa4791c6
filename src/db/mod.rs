//! Persistence gateway for the project tracker.
//!
//! Every public operation runs a single parameterized statement. User input is
//! always bound as a parameter; dynamic UPDATE clauses are assembled only from
//! fixed column names.

pub mod checklist;
pub mod milestones;
pub mod projects;
pub mod retrospectives;
pub mod tasks;
pub mod users;

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rusqlite::types::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let report = embedded::migrations::runner().run(conn)?;
            for migration in report.applied_migrations() {
                tracing::info!(migration = %migration, "Applied migration");
            }
            Ok(())
        })
    }

    /// Execute a function with exclusive access to the connection.
    ///
    /// The lock is released when `f` returns, on success or error.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))?;
        f(&conn)
    }

    /// Execute a function with mutable access to the connection.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))?;
        f(&mut conn)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Accumulates assignments for a sparse UPDATE.
///
/// Column names and expressions come from the caller's code, never from input.
#[derive(Default)]
pub(crate) struct SetClause {
    assignments: Vec<&'static str>,
    values: Vec<Value>,
}

impl SetClause {
    /// Add `column = <value>`.
    pub(crate) fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        self.assignments.push(column);
        self.values.push(value.into());
    }

    /// Add an assignment expression; `{p}` marks where `value` is bound.
    pub(crate) fn set_expr(&mut self, expr: &'static str, value: impl Into<Value>) {
        self.assignments.push(expr);
        self.values.push(value.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Build `UPDATE table SET ... WHERE key = ?N` and its parameters.
    pub(crate) fn into_statement(
        self,
        table: &'static str,
        key: &'static str,
        id: i64,
    ) -> (String, Vec<Value>) {
        let assignments: Vec<String> = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, assignment)| {
                let placeholder = format!("?{}", i + 1);
                if assignment.contains("{p}") {
                    assignment.replace("{p}", &placeholder)
                } else {
                    format!("{} = {}", assignment, placeholder)
                }
            })
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            table,
            assignments.join(", "),
            key,
            self.assignments.len() + 1
        );
        let mut values = self.values;
        values.push(Value::Integer(id));
        (sql, values)
    }
}

/// Bind `None` as NULL.
pub(crate) fn nullable<V: Into<Value>>(value: Option<V>) -> Value {
    value.map_or(Value::Null, Into::into)
}

/// Convert a calendar date to a bindable value.
pub(crate) fn date_value(date: Option<chrono::NaiveDate>) -> Value {
    match date {
        Some(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clause_numbers_placeholders_in_order() {
        let mut set = SetClause::default();
        set.set("title", "Write spec".to_string());
        set.set_expr("started_at = COALESCE(started_at, {p})", 42i64);

        let (sql, values) = set.into_statement("tasks", "id", 7);

        assert_eq!(
            sql,
            "UPDATE tasks SET title = ?1, started_at = COALESCE(started_at, ?2) WHERE id = ?3"
        );
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], Value::Integer(7));
    }

    #[test]
    fn date_value_formats_iso_dates() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(date_value(date), Value::Text("2024-01-05".into()));
        assert_eq!(date_value(None), Value::Null);
    }

    #[test]
    fn open_in_memory_enables_foreign_keys() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .with_conn(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
