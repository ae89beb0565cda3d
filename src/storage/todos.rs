//! Todo queries, always scoped to the owning user

use chrono::Utc;
use rusqlite::{params, Row};

use super::Database;
use crate::errors::Result;
use crate::models::{NewTodo, Todo, TodoPatch};

const TODO_COLUMNS: &str =
    "id, user_id, title, completed, priority, due_date, created_at, updated_at";

fn row_to_todo(row: &Row) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        completed: row.get(3)?,
        priority: row.get(4)?,
        due_date: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// All todos of a user, newest first
    pub fn list_todos(&self, user_id: i64) -> Result<Vec<Todo>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TODO_COLUMNS} FROM todos
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;

        let todos = stmt
            .query_map(params![user_id], row_to_todo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(todos)
    }

    pub fn get_todo(&self, id: i64, user_id: i64) -> Result<Option<Todo>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            row_to_todo,
        );

        match result {
            Ok(todo) => Ok(Some(todo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_todo(&self, user_id: i64, new: &NewTodo) -> Result<Todo> {
        let conn = self.get_connection()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO todos (user_id, title, completed, priority, due_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![user_id, new.title, new.completed, new.priority, new.due_date, now],
        )?;

        Ok(Todo {
            id: conn.last_insert_rowid(),
            user_id,
            title: new.title.clone(),
            completed: new.completed,
            priority: new.priority,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge a patch into a stored todo; `None` when absent or foreign
    pub fn update_todo(&self, id: i64, user_id: i64, patch: &TodoPatch) -> Result<Option<Todo>> {
        let Some(mut todo) = self.get_todo(id, user_id)? else {
            return Ok(None);
        };
        patch.apply(&mut todo);
        todo.updated_at = Utc::now();

        let conn = self.get_connection()?;
        let updated = conn.execute(
            "UPDATE todos
             SET title = ?3, completed = ?4, priority = ?5, due_date = ?6, updated_at = ?7
             WHERE id = ?1 AND user_id = ?2",
            params![
                id,
                user_id,
                todo.title,
                todo.completed,
                todo.priority,
                todo.due_date,
                todo.updated_at
            ],
        )?;

        Ok((updated > 0).then_some(todo))
    }

    /// Flip the completion flag in place
    pub fn toggle_todo(&self, id: i64, user_id: i64) -> Result<Option<Todo>> {
        let conn = self.get_connection()?;
        let updated = conn.execute(
            "UPDATE todos SET completed = NOT completed, updated_at = ?3
             WHERE id = ?1 AND user_id = ?2",
            params![id, user_id, Utc::now()],
        )?;
        drop(conn);

        if updated == 0 {
            return Ok(None);
        }
        self.get_todo(id, user_id)
    }

    pub fn delete_todo(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.get_connection()?;
        let deleted = conn.execute(
            "DELETE FROM todos WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}
