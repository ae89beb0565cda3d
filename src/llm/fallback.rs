//! Local templated answer used when no provider responds
//!
//! The output depends only on the todo titles: the generator is seeded from
//! them, so the same list always yields the same text.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{priority_label, TodoSnapshot};

const TIPS: &[&str] = &[
    "Break \"{title}\" into two or three smaller steps and finish the first one today.",
    "Block a fixed half hour in your calendar for \"{title}\".",
    "Ask yourself what \"done\" looks like for \"{title}\" and write it down.",
    "Pair \"{title}\" with something you already do every day so it becomes a habit.",
    "If \"{title}\" takes less than ten minutes, do it right now.",
    "Set a small reward for when \"{title}\" is finished.",
    "Check whether \"{title}\" can be delegated or shared with someone.",
    "Start \"{title}\" at the time of day you usually have the most energy.",
];

const UNTITLED: &str = "this task";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the trimmed titles, each followed by a 0xff byte
///
/// 0xff never occurs in UTF-8, so ["ab", "c"] and ["a", "bc"] differ.
fn seed_for(todos: &[TodoSnapshot]) -> u64 {
    todos
        .iter()
        .flat_map(|todo| todo.title.trim().bytes().chain(std::iter::once(0xff)))
        .fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        })
}

/// Build a non-empty suggestion text with one canned tip per todo
pub fn fallback_response(todos: &[TodoSnapshot]) -> String {
    let mut rng = StdRng::seed_from_u64(seed_for(todos));
    let mut out = String::from(
        "The assistant is unavailable right now, so here are some quick suggestions for your list:\n",
    );

    for (idx, todo) in todos.iter().enumerate() {
        let title = match todo.title.trim() {
            "" => UNTITLED,
            t => t,
        };
        let tip = TIPS[rng.gen_range(0..TIPS.len())].replace("{title}", title);
        let status = if todo.completed { " (already done)" } else { "" };
        out.push_str(&format!("\n{}. {}{}", idx + 1, tip, status));
        if matches!(todo.priority, Some(1)) {
            out.push_str(&format!(" This one is marked {} priority.", priority_label(todo.priority)));
        }
    }

    if todos.is_empty() {
        out.push_str("\nAdd a few todos and ask again for tailored advice.");
    }
    out
}
