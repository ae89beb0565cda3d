//! Account queries

use chrono::Utc;
use rusqlite::{params, Row};

use super::{is_constraint_violation, Database};
use crate::errors::{AppError, Result};
use crate::models::User;

const USER_COLUMNS: &str = "id, username, password_hash, created_at, updated_at";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

impl Database {
    /// Insert a new account; a taken handle maps to `UsernameTaken`
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let conn = self.get_connection()?;
        let now = Utc::now();
        let inserted = conn.execute(
            "INSERT INTO users (username, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![username, password_hash, now],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(AppError::UsernameTaken(username.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Change handle and/or password hash; `None` when the account is gone
    pub fn update_user(
        &self,
        id: i64,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>> {
        let conn = self.get_connection()?;
        let updated = conn.execute(
            "UPDATE users
             SET username = COALESCE(?2, username),
                 password_hash = COALESCE(?3, password_hash),
                 updated_at = ?4
             WHERE id = ?1",
            params![id, username, password_hash, Utc::now()],
        );
        match updated {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(AppError::UsernameTaken(username.unwrap_or_default().to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        drop(conn);

        self.find_user_by_id(id)
    }

    /// Remove an account together with its todos and turns
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.get_connection()?;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
