use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// How many trailing lines to inspect for the raising error's message.
const TAIL_LINES: usize = 10;

static ERROR_KIND_PATTERN: OnceLock<Regex> = OnceLock::new();
static FRAME_PATTERN: OnceLock<Regex> = OnceLock::new();

/// `TimeoutError: ...`, `ValueError: ...`, `SomeException: ...`
fn error_kind_pattern() -> &'static Regex {
    ERROR_KIND_PATTERN.get_or_init(|| Regex::new(r"^(\w+(?:Error|Exception)):").unwrap())
}

/// Traceback frame reference: `File "path/to/main.py", line 42`
fn frame_pattern() -> &'static Regex {
    FRAME_PATTERN.get_or_init(|| Regex::new(r#"File "([^"]+)", line (\d+)"#).unwrap())
}

/// Extract an error kind and source location from raw error output.
///
/// The kind comes from the last matching line among the final ten (the
/// raising frame's message conventionally ends the output); the location from
/// the first frame reference anywhere, formatted `basename:line`. This is a
/// heuristic, not a parser: anything unrecognized yields `None` for that
/// field, and no input can make it fail.
pub fn extract_error_summary(raw: &str) -> (Option<String>, Option<String>) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (None, None);
    }

    let lines: Vec<&str> = trimmed.lines().collect();

    let error_kind = lines
        .iter()
        .rev()
        .take(TAIL_LINES)
        .find_map(|line| {
            error_kind_pattern()
                .captures(line.trim())
                .map(|caps| caps[1].to_string())
        });

    let error_location = lines.iter().find_map(|line| {
        frame_pattern().captures(line).map(|caps| {
            let basename = Path::new(&caps[1])
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| caps[1].to_string());
            format!("{}:{}", basename, &caps[2])
        })
    });

    (error_kind, error_location)
}
