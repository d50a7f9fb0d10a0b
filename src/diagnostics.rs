//! Turns raw validator output into the compact verdict text fed back to the
//! oracle during healing.

/// How many trailing lines of each stream survive into the verdict.
pub const TAIL_LINES: usize = 40;

/// Keeps the last `limit` lines of `text` in their original order.
pub fn tail(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].join("\n")
}

/// Renders a failed validation run as a verdict string. The tail of each
/// stream is kept because test runners print the failure summary last.
pub fn format_failure(exit_code: Option<i32>, stdout: &str, stderr: &str) -> String {
    let mut verdict = match exit_code {
        Some(code) => format!("validation command exited with status {code}"),
        None => "validation command was terminated by a signal".to_string(),
    };
    let stdout = stdout.trim();
    let stderr = stderr.trim();
    if !stdout.is_empty() {
        verdict.push_str("\n\n--- stdout (tail) ---\n");
        verdict.push_str(&tail(stdout, TAIL_LINES));
    }
    if !stderr.is_empty() {
        verdict.push_str("\n\n--- stderr (tail) ---\n");
        verdict.push_str(&tail(stderr, TAIL_LINES));
    }
    verdict
}
