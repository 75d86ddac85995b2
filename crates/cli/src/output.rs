//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output. Diagnostics go to stderr
//! so plans printed on stdout can be piped.

use owo_colors::OwoColorize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a boxed warning that is hard to miss in build logs
    pub fn alert(title: &str, details: &[&str]) {
        let width = details
            .iter()
            .map(|d| d.chars().count())
            .chain(std::iter::once(title.chars().count()))
            .max()
            .unwrap_or(0)
            + 4;
        let rule = "━".repeat(width);

        eprintln!();
        eprintln!("{}", rule.yellow());
        eprintln!("{} {}", "⚠".yellow().bold(), title.yellow().bold());
        for detail in details {
            eprintln!("  {}", detail);
        }
        eprintln!("{}", rule.yellow());
        eprintln!();
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print a `key: value` line
    pub fn field(key: &str, value: &str) {
        println!("  {:<18} {}", format!("{}:", key).dimmed(), value);
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Format a boolean as on/off
pub fn format_flag(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count_singular() {
        assert_eq!(format_count(1, "file", "files"), "1 file");
    }

    #[test]
    fn test_format_count_plural() {
        assert_eq!(format_count(0, "rules file", "rules files"), "0 rules files");
    }

    #[test]
    fn test_format_flag() {
        assert_eq!(format_flag(true), "on");
        assert_eq!(format_flag(false), "off");
    }
}
