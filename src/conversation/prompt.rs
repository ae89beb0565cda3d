//! Prompt assembly for conversation turns

use crate::llm::ChatMessage;
use crate::models::{priority_label, ConversationTurn, TodoSnapshot};

const PREAMBLE: &str = "You are a friendly productivity assistant inside a todo list app. \
Look at the user's todos and answer their question with concrete, practical advice: \
what to do first, how to break large items down, and how to handle due dates. \
Keep the answer short, use plain language, and refer to todos by their titles.";

/// System prompt; continuing turns also carry the prior exchanges
pub fn system_prompt(prior: &[ConversationTurn], round: i64) -> String {
    let mut prompt = PREAMBLE.to_string();
    if prior.is_empty() {
        return prompt;
    }

    prompt.push_str("\n\nThis is a continuing conversation. Previous exchanges, oldest first:\n");
    for (idx, turn) in prior.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[Round {}]\nUser: {}\nAssistant: {}\n",
            idx + 1,
            turn.query.trim(),
            turn.response.trim()
        ));
    }
    prompt.push_str(&format!(
        "\nThis is round {round} of the conversation. Build on what was already said instead of repeating it."
    ));
    prompt
}

fn describe_todo(todo: &TodoSnapshot) -> String {
    let title = match todo.title.trim() {
        "" => "(untitled)",
        t => t,
    };
    let status = if todo.completed { "completed" } else { "pending" };
    let due = todo
        .due_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| format!("due {d}"))
        .unwrap_or_else(|| "no due date".to_string());

    format!(
        "- {title} (status: {status}, priority: {}, {due})",
        priority_label(todo.priority)
    )
}

/// User prompt listing every todo followed by the question
pub fn user_prompt(query: &str, todos: &[TodoSnapshot]) -> String {
    let list: Vec<String> = todos.iter().map(describe_todo).collect();
    format!(
        "My todos:\n{}\n\nMy question: {}",
        list.join("\n"),
        query.trim()
    )
}

/// System/user message pair sent to the provider
pub fn build_messages(
    query: &str,
    todos: &[TodoSnapshot],
    prior: &[ConversationTurn],
    round: i64,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(prior, round)),
        ChatMessage::user(user_prompt(query, todos)),
    ]
}
