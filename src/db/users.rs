//! User accounts.

use super::{Database, now_ms};
use crate::types::User;
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        username: row.get("username")?,
        created_at: row.get("created_at")?,
        last_login: row.get("last_login")?,
    })
}

impl Database {
    /// Insert a user with an already-hashed password. Returns the new id.
    pub fn insert_user(&self, email: &str, password_hash: &str, username: &str) -> Result<i64> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, password_hash, username, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![email, password_hash, username, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT * FROM users WHERE id = ?1",
                    params![user_id],
                    parse_user_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT * FROM users WHERE email = ?1",
                    params![email],
                    parse_user_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Stamp last_login with the current time. Returns false if the user is unknown.
    pub fn touch_last_login(&self, user_id: i64) -> Result<bool> {
        let now = now_ms();
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                params![now, user_id],
            )?;
            Ok(rows > 0)
        })
    }
}
