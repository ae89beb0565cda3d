//! Conversation turn queries
//!
//! Every lookup filters by `user_id` so a turn id belonging to another
//! account behaves exactly like a missing one.

use chrono::Utc;
use rusqlite::{params, Row};

use super::Database;
use crate::errors::Result;
use crate::models::{ConversationTurn, NewTurn};

const TURN_COLUMNS: &str =
    "id, user_id, query, todos, response, model, parent_id, conversation_count, created_at";

/// Parse the stored snapshot, keeping the raw text when it is not JSON
fn parse_snapshot(raw: String) -> serde_json::Value {
    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
}

fn row_to_turn(row: &Row) -> rusqlite::Result<ConversationTurn> {
    Ok(ConversationTurn {
        id: row.get(0)?,
        user_id: row.get(1)?,
        query: row.get(2)?,
        todos: parse_snapshot(row.get(3)?),
        response: row.get(4)?,
        model: row.get(5)?,
        parent_id: row.get(6)?,
        conversation_count: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Database {
    pub fn insert_turn(&self, turn: &NewTurn) -> Result<ConversationTurn> {
        let todos_json = serde_json::to_string(&turn.todos)?;
        let conn = self.get_connection()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO ai_history
                (user_id, query, todos, response, model, parent_id, conversation_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                turn.user_id,
                turn.query,
                todos_json,
                turn.response,
                turn.model,
                turn.parent_id,
                turn.conversation_count,
                now
            ],
        )?;

        Ok(ConversationTurn {
            id: conn.last_insert_rowid(),
            user_id: turn.user_id,
            query: turn.query.clone(),
            todos: parse_snapshot(todos_json),
            response: turn.response.clone(),
            model: turn.model.clone(),
            parent_id: turn.parent_id,
            conversation_count: turn.conversation_count,
            created_at: now,
        })
    }

    /// Ownership-scoped lookup of a single turn
    pub fn find_turn(&self, id: i64, user_id: i64) -> Result<Option<ConversationTurn>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            &format!("SELECT {TURN_COLUMNS} FROM ai_history WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            row_to_turn,
        );

        match result {
            Ok(turn) => Ok(Some(turn)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent turns of a user, newest first
    pub fn recent_turns(&self, user_id: i64, limit: usize) -> Result<Vec<ConversationTurn>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TURN_COLUMNS} FROM ai_history
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        ))?;

        let turns = stmt
            .query_map(params![user_id, limit as i64], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    /// Root turns of a user, newest first, each with the size of its thread
    pub fn root_summaries(&self, user_id: i64, limit: usize) -> Result<Vec<(ConversationTurn, i64)>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "WITH RECURSIVE tree(root_id, id) AS (
                 SELECT id, id FROM ai_history WHERE user_id = ?1 AND parent_id IS NULL
                 UNION
                 SELECT tree.root_id, h.id
                 FROM ai_history h JOIN tree ON h.parent_id = tree.id
                 WHERE h.user_id = ?1
             )
             SELECT {TURN_COLUMNS},
                    (SELECT COUNT(*) FROM tree WHERE tree.root_id = ai_history.id)
             FROM ai_history
             WHERE user_id = ?1 AND parent_id IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        ))?;

        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok((row_to_turn(row)?, row.get(9)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// A turn and every descendant of it, oldest first
    ///
    /// Walks all generations with a recursive CTE; `UNION` discards repeats,
    /// so a corrupted parent cycle terminates.
    pub fn turn_with_descendants(&self, root_id: i64, user_id: i64) -> Result<Vec<ConversationTurn>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "WITH RECURSIVE thread(id) AS (
                 SELECT id FROM ai_history WHERE id = ?1 AND user_id = ?2
                 UNION
                 SELECT h.id
                 FROM ai_history h JOIN thread ON h.parent_id = thread.id
                 WHERE h.user_id = ?2
             )
             SELECT {TURN_COLUMNS} FROM ai_history
             WHERE id IN (SELECT id FROM thread)
             ORDER BY created_at ASC, id ASC"
        ))?;

        let turns = stmt
            .query_map(params![root_id, user_id], row_to_turn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(turns)
    }

    /// Delete a turn and its direct children
    ///
    /// Grandchildren survive with a dangling `parent_id`. Returns `false`
    /// when the turn does not exist or belongs to someone else.
    pub fn delete_turn(&self, id: i64, user_id: i64) -> Result<bool> {
        let conn = self.get_connection()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM ai_history WHERE id = ?1 AND user_id = ?2)",
            params![id, user_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(false);
        }

        conn.execute(
            "DELETE FROM ai_history WHERE user_id = ?2 AND (id = ?1 OR parent_id = ?1)",
            params![id, user_id],
        )?;
        Ok(true)
    }

    /// Delete every turn owned by a user; returns the number removed
    pub fn delete_all_turns(&self, user_id: i64) -> Result<usize> {
        let conn = self.get_connection()?;
        let deleted = conn.execute("DELETE FROM ai_history WHERE user_id = ?1", params![user_id])?;
        Ok(deleted)
    }
}
