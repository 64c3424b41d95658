use chrono::NaiveDate;
use common::{FinanceResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "income"),
            TransactionKind::Expense => write!(f, "expense"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "receita" => Ok(TransactionKind::Income),
            "expense" | "despesa" => Ok(TransactionKind::Expense),
            other => Err(ValidationError::InvalidField {
                field: "type".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Одна финансовая операция пользователя
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub description: String,
}

impl Transaction {
    pub fn income(date: NaiveDate, amount: f64, category: &str, description: &str) -> Self {
        Self {
            date,
            amount,
            category: category.to_string(),
            kind: TransactionKind::Income,
            description: description.to_string(),
        }
    }

    pub fn expense(date: NaiveDate, amount: f64, category: &str, description: &str) -> Self {
        Self {
            date,
            amount,
            category: category.to_string(),
            kind: TransactionKind::Expense,
            description: description.to_string(),
        }
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// `YYYY-MM` bucket used by the monthly aggregations
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

pub fn load_json<P: AsRef<Path>>(path: P) -> FinanceResult<Vec<Transaction>> {
    let content = fs::read_to_string(path.as_ref())?;
    let transactions: Vec<Transaction> = serde_json::from_str(&content)?;
    debug!(count = transactions.len(), path = %path.as_ref().display(), "Transactions loaded");
    Ok(transactions)
}

pub fn save_json<P: AsRef<Path>>(path: P, transactions: &[Transaction]) -> FinanceResult<()> {
    let json = serde_json::to_string_pretty(transactions)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load by extension: `.csv` is read as CSV, anything else as JSON
pub fn load_file<P: AsRef<Path>>(path: P) -> FinanceResult<Vec<Transaction>> {
    let is_csv = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        crate::csv::read_csv(path)
    } else {
        load_json(path)
    }
}
