//! Shared utility functions.

/// Shorten `text` to at most `max_chars` characters, appending `...` when cut.
///
/// Newlines are flattened so the preview stays on one line.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Read seed tasks from a file, one task per line.
///
/// List markers and blank lines are ignored.
pub fn read_task_file(path: &std::path::Path) -> crate::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(crate::orchestration::parse_task_list(&text))
}
