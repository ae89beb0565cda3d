//! Thread reconstruction
//!
//! A thread is everything reachable downward from the root of a turn's
//! ancestor chain; the chain alone is what a continuation replays. The upward walk is scoped to the owning user and stops at
//! the last parent that still resolves, so deleted ancestors truncate the
//! thread instead of failing the request.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::constants::MAX_PARENT_HOPS;
use crate::errors::Result;
use crate::models::ConversationTurn;
use crate::storage::Database;

/// `start` followed by each resolvable ancestor, nearest first
fn lineage(db: &Database, start: ConversationTurn, user_id: i64) -> Result<Vec<ConversationTurn>> {
    let mut seen = HashSet::from([start.id]);
    let mut line = vec![start];

    for _ in 0..MAX_PARENT_HOPS {
        let current = &line[line.len() - 1];
        let Some(parent_id) = current.parent_id else {
            return Ok(line);
        };
        if !seen.insert(parent_id) {
            warn!(turn_id = current.id, parent_id, "parent cycle detected; stopping walk");
            return Ok(line);
        }
        match db.find_turn(parent_id, user_id)? {
            Some(parent) => line.push(parent),
            None => {
                debug!(turn_id = current.id, parent_id, "parent no longer resolves; truncating thread");
                return Ok(line);
            }
        }
    }

    warn!(turn_id = line[line.len() - 1].id, "parent chain exceeds {} hops", MAX_PARENT_HOPS);
    Ok(line)
}

/// Walk parent links up from `start` to the topmost resolvable turn
pub fn find_root(db: &Database, start: ConversationTurn, user_id: i64) -> Result<ConversationTurn> {
    let mut line = lineage(db, start, user_id)?;
    line.pop()
        .ok_or_else(|| anyhow::anyhow!("parent walk returned no turns").into())
}

/// The turns that led to `turn_id`, root first and `turn_id` last
///
/// Sibling branches are not part of the chain. Empty when the turn does not
/// exist or belongs to another user.
pub fn ancestor_chain(db: &Database, turn_id: i64, user_id: i64) -> Result<Vec<ConversationTurn>> {
    let Some(start) = db.find_turn(turn_id, user_id)? else {
        return Ok(Vec::new());
    };
    let mut line = lineage(db, start, user_id)?;
    line.reverse();
    Ok(line)
}

/// The full conversation containing `turn_id`, oldest first
///
/// Empty when the turn does not exist or belongs to another user.
pub fn resolve_thread(db: &Database, turn_id: i64, user_id: i64) -> Result<Vec<ConversationTurn>> {
    let Some(start) = db.find_turn(turn_id, user_id)? else {
        return Ok(Vec::new());
    };
    let root = find_root(db, start, user_id)?;
    db.turn_with_descendants(root.id, user_id)
}
