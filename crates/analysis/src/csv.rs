//! Minimal RFC 4180 reader/writer for transaction files.
//!
//! Header: `date,amount,category,type,description`. Fields containing a
//! comma, quote or line break are quoted, quotes are doubled.

use crate::transaction::{Transaction, TransactionKind};
use common::formatters::parse_flexible_date;
use common::{FinanceResult, ValidationError};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const CSV_HEADER: [&str; 5] = ["date", "amount", "category", "type", "description"];

fn escape_field(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn to_csv_string(transactions: &[Transaction]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for tx in transactions {
        let row = [
            tx.date.format("%Y-%m-%d").to_string(),
            tx.amount.to_string(),
            escape_field(&tx.category),
            tx.kind.to_string(),
            escape_field(&tx.description),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn write_csv<P: AsRef<Path>>(path: P, transactions: &[Transaction]) -> FinanceResult<()> {
    fs::write(path.as_ref(), to_csv_string(transactions))?;
    debug!(count = transactions.len(), path = %path.as_ref().display(), "CSV written");
    Ok(())
}

/// Split CSV text into records, honouring quoted fields
fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
        .into_iter()
        .filter(|r| !(r.len() == 1 && r[0].trim().is_empty()))
        .collect()
}

fn invalid(field: &str, value: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
    }
}

pub fn parse_csv(content: &str) -> FinanceResult<Vec<Transaction>> {
    let mut records = parse_records(content).into_iter();

    let header = records.next().unwrap_or_default();
    let index_of = |name: &str| -> FinanceResult<usize> {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| invalid("csv header", &format!("missing column '{name}'")).into())
    };
    let date_idx = index_of("date")?;
    let amount_idx = index_of("amount")?;
    let category_idx = index_of("category")?;
    let type_idx = index_of("type")?;
    let description_idx = header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("description"));

    let mut transactions = Vec::new();
    for (line, record) in records.enumerate() {
        let get = |idx: usize| record.get(idx).map(|s| s.trim()).unwrap_or("");

        // bank exports often use dd/mm/yyyy
        let date = parse_flexible_date(get(date_idx))
            .ok_or_else(|| invalid("date", &format!("line {}: {}", line + 2, get(date_idx))))?;
        let amount: f64 = get(amount_idx)
            .parse()
            .map_err(|_| invalid("amount", &format!("line {}: {}", line + 2, get(amount_idx))))?;
        let kind: TransactionKind = get(type_idx).parse()?;

        transactions.push(Transaction {
            date,
            amount,
            category: get(category_idx).to_string(),
            kind,
            description: description_idx.map(get).unwrap_or("").to_string(),
        });
    }

    Ok(transactions)
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> FinanceResult<Vec<Transaction>> {
    let content = fs::read_to_string(path.as_ref())?;
    let transactions = parse_csv(&content)?;
    debug!(count = transactions.len(), path = %path.as_ref().display(), "CSV read");
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(escape_field("Lazer"), "Lazer");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_parse_quoted_fields() {
        let content = "date,amount,category,type,description\n\
                       2024-01-10,35.50,Alimentação,expense,\"Almoço, com \"\"amigos\"\"\"\n";
        let txs = parse_csv(content).unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "Almoço, com \"amigos\"");
        assert_eq!(txs[0].amount, 35.5);
    }

    #[test]
    fn test_export_keeps_full_amount_precision() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let txs = vec![
            Transaction::expense(date, 12.345_678, "Lazer", "Cinema"),
            Transaction::income(date, 5000.0, "Salário", "Salário mensal"),
        ];
        let csv = to_csv_string(&txs);
        assert!(csv.contains("12.345678"));
        assert_eq!(parse_csv(&csv).unwrap(), txs);
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let err = parse_csv("date,amount\n2024-01-01,10\n").unwrap_err();
        assert!(err.to_string().contains("category"));
    }

    #[test]
    fn test_bad_amount_reports_line() {
        let content = "date,amount,category,type\n2024-01-01,abc,Lazer,expense\n";
        let err = parse_csv(content).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_brazilian_dates_are_accepted() {
        let content = "date,amount,category,type\n15/03/2024,99.90,Lazer,despesa\n";
        let txs = parse_csv(content).unwrap();
        assert_eq!(txs[0].date, chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert!(txs[0].is_expense());
    }
}
