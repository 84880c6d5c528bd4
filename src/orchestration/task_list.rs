//! Parsing of generator output into task names.
//!
//! Generators backed by a language model answer with free text: usually one
//! task per line, often numbered or bulleted, sometimes a JSON array. Entries
//! that cannot be read as text are dropped one at a time; an empty result
//! simply means there is no new work.

use std::sync::LazyLock;

use regex::Regex;

use crate::tlog_trace;

/// Leading list markers: `-`, `*`, `+`, `•`, `1.`, `2)`, `Task 3:`.
static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+•](?:\s+|$)|\d+[.)](?:\s+|$)|(?i:task)\s*\d+\s*[:.)-]\s*)").unwrap()
});

/// Parse raw generator text into an ordered list of task names.
///
/// A JSON array keeps its string entries and drops everything else. Any
/// other text is split into lines. Each entry is trimmed and stripped of a
/// leading list marker; blank entries are dropped.
pub fn parse_task_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();

    if trimmed.starts_with('[') {
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(trimmed) {
            let entries: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    other => {
                        tlog_trace!("task_list: dropping non-text entry {}", other);
                        None
                    }
                })
                .collect();
            return normalize_candidates(entries.iter().map(|s| strip_marker(s)));
        }
    }

    normalize_candidates(trimmed.lines().map(strip_marker))
}

/// Trim candidates and drop the empty ones, keeping order.
///
/// Duplicates are kept on purpose: the generator decides what is new work.
pub fn normalize_candidates<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .filter_map(|c| {
            let name = c.as_ref().trim();
            if name.is_empty() {
                tlog_trace!("task_list: dropping blank candidate");
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

fn strip_marker(line: &str) -> String {
    let line = line.trim();
    LIST_MARKER_RE.replace(line, "").trim().to_string()
}
