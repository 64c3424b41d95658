use crate::csv::write_csv;
use crate::transaction::{Transaction, TransactionKind};
use common::{invalid_input, FinanceResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Recommended share of income kept as savings, percent
pub const SAVINGS_TARGET: f64 = 20.0;
const SAVINGS_WARNING: f64 = 10.0;
/// A single category above this share of expenses gets flagged
const CATEGORY_CONCENTRATION: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    /// balance / income * 100, zero without income
    pub savings_rate: f64,
    pub transaction_count: usize,
    pub avg_expense: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    Positive,
    Warning,
    Alert,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub level: InsightLevel,
    pub message: String,
}

impl Insight {
    fn new(level: InsightLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Тренд расходов между двумя последними месяцами
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "direction", content = "percent", rename_all = "snake_case")]
pub enum SpendingTrend {
    Increasing(f64),
    Decreasing(f64),
    Stable,
    InsufficientData,
}

impl fmt::Display for SpendingTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpendingTrend::Increasing(p) => write!(f, "Aumentando ({p:.1}%)"),
            SpendingTrend::Decreasing(p) => write!(f, "Diminuindo ({p:.1}%)"),
            SpendingTrend::Stable => write!(f, "Estável"),
            SpendingTrend::InsufficientData => write!(f, "Dados insuficientes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingReport {
    pub total_spent: f64,
    pub by_category: BTreeMap<String, f64>,
    pub monthly_mean: f64,
    pub trend: SpendingTrend,
    /// `dd/mm/yyyy a dd/mm/yyyy`, absent without expenses
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub transaction: Transaction,
    pub category_mean: f64,
    pub category_std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
    pub std_dev: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation (n - 1); `None` below two values
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Аналитика по списку транзакций
#[derive(Debug, Clone, Default)]
pub struct FinancialDataAnalyzer {
    transactions: Vec<Transaction>,
}

impl FinancialDataAnalyzer {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn load_transactions(&mut self, transactions: Vec<Transaction>) {
        debug!(count = transactions.len(), "Transactions replaced");
        self.transactions = transactions;
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn expenses(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| t.is_expense())
    }

    fn total_of(&self, kind: TransactionKind) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    }

    /// `None` when there are no transactions
    pub fn summary(&self) -> Option<FinancialSummary> {
        if self.transactions.is_empty() {
            return None;
        }

        let total_income = self.total_of(TransactionKind::Income);
        let total_expense = self.total_of(TransactionKind::Expense);
        let balance = total_income - total_expense;
        let expense_amounts: Vec<f64> = self.expenses().map(|t| t.amount).collect();

        Some(FinancialSummary {
            total_income,
            total_expense,
            balance,
            savings_rate: if total_income > 0.0 {
                balance / total_income * 100.0
            } else {
                0.0
            },
            transaction_count: self.transactions.len(),
            avg_expense: mean(&expense_amounts),
        })
    }

    pub fn expenses_by_category(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for tx in self.expenses() {
            *totals.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
        }
        totals
    }

    /// Income, expense and balance per `YYYY-MM`, chronological
    pub fn monthly_trend(&self) -> Vec<MonthlyPoint> {
        let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for tx in &self.transactions {
            let entry = months.entry(tx.month_key()).or_insert((0.0, 0.0));
            match tx.kind {
                TransactionKind::Income => entry.0 += tx.amount,
                TransactionKind::Expense => entry.1 += tx.amount,
            }
        }

        months
            .into_iter()
            .map(|(month, (income, expense))| MonthlyPoint {
                month,
                income,
                expense,
                balance: income - expense,
            })
            .collect()
    }

    pub fn insights(&self) -> Vec<Insight> {
        let Some(summary) = self.summary() else {
            return vec![Insight::new(
                InsightLevel::Info,
                "Nenhuma transação disponível para análise.",
            )];
        };

        let mut insights = Vec::new();
        let rate = summary.savings_rate;
        if rate > SAVINGS_TARGET {
            insights.push(Insight::new(
                InsightLevel::Positive,
                format!(
                    "Excelente! Sua taxa de poupança é de {rate:.1}%, acima da recomendação de 20%."
                ),
            ));
        } else if rate > SAVINGS_WARNING {
            insights.push(Insight::new(
                InsightLevel::Warning,
                format!("Sua taxa de poupança é de {rate:.1}%. Tente aumentar para pelo menos 20%."),
            ));
        } else {
            insights.push(Insight::new(
                InsightLevel::Alert,
                format!("Atenção! Sua taxa de poupança é de apenas {rate:.1}%. Revise seus gastos."),
            ));
        }

        let by_category = self.expenses_by_category();
        if let Some((category, amount)) = by_category
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .filter(|_| summary.total_expense > 0.0)
        {
            let share = amount / summary.total_expense * 100.0;
            insights.push(Insight::new(
                InsightLevel::Info,
                format!("Maior gasto: {category} ({share:.1}% do total)."),
            ));
            if share > CATEGORY_CONCENTRATION {
                insights.push(Insight::new(
                    InsightLevel::Warning,
                    format!(
                        "{category} representa mais de 40% dos seus gastos. Considere reduzir."
                    ),
                ));
            }
        }

        if summary.avg_expense > 0.0 {
            insights.push(Insight::new(
                InsightLevel::Info,
                format!(
                    "Sua despesa média por transação é {}.",
                    common::formatters::format_currency(summary.avg_expense)
                ),
            ));
        }

        insights
    }

    pub fn spending_report(&self) -> SpendingReport {
        let expenses: Vec<&Transaction> = self.expenses().collect();
        if expenses.is_empty() {
            return SpendingReport {
                total_spent: 0.0,
                by_category: BTreeMap::new(),
                monthly_mean: 0.0,
                trend: SpendingTrend::InsufficientData,
                period: None,
            };
        }

        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
        for tx in &expenses {
            *monthly.entry(tx.month_key()).or_insert(0.0) += tx.amount;
        }
        let monthly_totals: Vec<f64> = monthly.values().copied().collect();

        let trend = match monthly_totals.as_slice() {
            [.., previous, last] => {
                let diff = last - previous;
                if diff > 0.0 {
                    SpendingTrend::Increasing(diff / previous * 100.0)
                } else if diff < 0.0 {
                    SpendingTrend::Decreasing((diff / previous * 100.0).abs())
                } else {
                    SpendingTrend::Stable
                }
            }
            _ => SpendingTrend::InsufficientData,
        };

        let start = expenses.iter().map(|t| t.date).min();
        let end = expenses.iter().map(|t| t.date).max();
        let period = start.zip(end).map(|(s, e)| {
            format!("{} a {}", s.format("%d/%m/%Y"), e.format("%d/%m/%Y"))
        });

        SpendingReport {
            total_spent: expenses.iter().map(|t| t.amount).sum(),
            by_category: self.expenses_by_category(),
            monthly_mean: mean(&monthly_totals),
            trend,
            period,
        }
    }

    /// Despesas fora de `deviations` desvios-padrão da média da categoria.
    ///
    /// Categories with fewer than two expenses have no deviation and never
    /// produce anomalies.
    pub fn detect_anomalies(&self, deviations: f64) -> Vec<Anomaly> {
        let mut per_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for tx in self.expenses() {
            per_category
                .entry(tx.category.as_str())
                .or_default()
                .push(tx.amount);
        }

        let stats: BTreeMap<&str, (f64, f64)> = per_category
            .iter()
            .filter_map(|(category, values)| {
                sample_std(values).map(|std| (*category, (mean(values), std)))
            })
            .collect();

        self.expenses()
            .filter_map(|tx| {
                let (category_mean, category_std) = *stats.get(tx.category.as_str())?;
                ((tx.amount - category_mean).abs() > deviations * category_std).then(|| Anomaly {
                    transaction: tx.clone(),
                    category_mean,
                    category_std,
                })
            })
            .collect()
    }

    /// `None` when there are no expenses
    pub fn kpis(&self) -> Option<Kpis> {
        let amounts: Vec<f64> = self.expenses().map(|t| t.amount).collect();
        if amounts.is_empty() {
            return None;
        }

        Some(Kpis {
            total: amounts.iter().sum(),
            mean: mean(&amounts),
            median: median(&amounts),
            max: amounts.iter().copied().fold(f64::MIN, f64::max),
            min: amounts.iter().copied().fold(f64::MAX, f64::min),
            count: amounts.len(),
            std_dev: sample_std(&amounts).unwrap_or(0.0),
        })
    }

    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> FinanceResult<()> {
        if self.transactions.is_empty() {
            return Err(invalid_input("transactions", "no transactions to export"));
        }
        write_csv(path.as_ref(), &self.transactions)?;
        info!(count = self.transactions.len(), path = %path.as_ref().display(), "Transactions exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_helpers() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert!(sample_std(&[5.0]).is_none());
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn test_trend_display() {
        assert_eq!(SpendingTrend::Increasing(12.345).to_string(), "Aumentando (12.3%)");
        assert_eq!(SpendingTrend::Stable.to_string(), "Estável");
    }
}
