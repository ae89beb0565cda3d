//! Domain records shared by storage, the conversation engine and handlers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Registered account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

/// Stored todo item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub completed: bool,
    /// 1 = high, 2 = medium, 3 = low; storage does not enforce the range
    pub priority: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a new todo
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
    pub priority: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

/// Partial todo update; `None` leaves the stored value untouched
///
/// For the nullable columns the outer `Option` says whether the field was
/// sent at all and the inner one carries an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Option<i64>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    /// Merge the present fields over a stored todo
    pub fn apply(&self, todo: &mut Todo) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
    }
}

/// Distinguish a missing field from an explicit `null`
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Accept priorities sent as numbers or numeric strings; anything else is dropped
fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Todo record as attached to a conversation turn
///
/// Clients send whatever their list holds, so every field is optional and
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TodoSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Option<i64>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
}

impl From<&Todo> for TodoSnapshot {
    fn from(todo: &Todo) -> Self {
        Self {
            id: Some(todo.id),
            title: todo.title.clone(),
            completed: todo.completed,
            priority: todo.priority,
            due_date: todo.due_date.map(|d| d.to_string()),
        }
    }
}

/// Human label for a stored priority
pub fn priority_label(priority: Option<i64>) -> &'static str {
    match priority {
        Some(1) => "high",
        Some(2) => "medium",
        Some(3) => "low",
        Some(_) => "unranked",
        None => "none",
    }
}

/// One persisted request/response exchange with a language model
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub id: i64,
    pub user_id: i64,
    pub query: String,
    /// Parsed snapshot, or the raw stored text when it is not valid JSON
    pub todos: serde_json::Value,
    pub response: String,
    pub model: String,
    pub parent_id: Option<i64>,
    pub conversation_count: i64,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Fields of a turn about to be written
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub user_id: i64,
    pub query: String,
    pub todos: Vec<TodoSnapshot>,
    pub response: String,
    pub model: String,
    pub parent_id: Option<i64>,
    pub conversation_count: i64,
}

/// Turn as returned by the history and thread endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnView {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub todos: serde_json::Value,
    pub response: String,
    pub model: String,
    pub parent_id: Option<i64>,
    pub conversation_count: i64,
    pub is_root: bool,
}

impl From<ConversationTurn> for TurnView {
    fn from(turn: ConversationTurn) -> Self {
        let is_root = turn.is_root();
        Self {
            id: turn.id,
            timestamp: turn.created_at,
            query: turn.query,
            todos: turn.todos,
            response: turn.response,
            model: turn.model,
            parent_id: turn.parent_id,
            conversation_count: turn.conversation_count,
            is_root,
        }
    }
}

/// Root turn with the size of its thread, for the grouped history view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootSummary {
    #[serde(flatten)]
    pub turn: TurnView,
    pub turn_count: i64,
}
