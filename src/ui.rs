use console::style;
use std::fmt::Display;

/// Green bold — generated artifacts, success lines
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// White bold — section headers
pub fn header<D: Display>(text: D) -> String {
    style(text).white().bold().to_string()
}

/// Dim — timings, secondary detail
pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Yellow — failures and verdict excerpts
pub fn warn<D: Display>(text: D) -> String {
    style(text).yellow().to_string()
}

/// Green — paths and counts
pub fn value<D: Display>(text: D) -> String {
    style(text).green().to_string()
}

/// Cyan bold — progress markers
pub fn accent<D: Display>(text: D) -> String {
    style(text).cyan().bold().to_string()
}
