//! Общие помощники вывода для команд

use anyhow::Result;
use colored::*;
use common::formatters::{format_currency, format_number};
use prettytable::{format, Table};
use serde::Serialize;

/// Pretty JSON on stdout for `--json` flags
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn header(title: &str) {
    println!("\n{}", title.bold());
}

pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", label.cyan(), value);
}

pub fn money(value: f64) -> String {
    format_currency(value)
}

/// `12.5` -> `12,50%`
pub fn percent(value: f64) -> String {
    format!("{}%", format_number(value, 2, false))
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn failure(message: &str) {
    println!("{} {}", "✗".red(), message);
}

/// Status line on stderr, keeps stdout clean for `--json`
pub fn notice(message: &str) {
    eprintln!("{} {}", "•".dimmed(), message);
}

pub fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_uses_brazilian_decimal_comma() {
        assert_eq!(percent(12.5), "12,50%");
        assert_eq!(money(1234.56), "R$ 1.234,56");
    }
}
