//! Transaction analytics: summaries, monthly trends, insights, anomaly
//! detection and KPIs, plus JSON/CSV I/O and a sample data generator.

pub mod analyzer;
pub mod csv;
pub mod sample;
pub mod transaction;

pub use analyzer::{
    Anomaly, FinancialDataAnalyzer, FinancialSummary, Insight, InsightLevel, Kpis, MonthlyPoint,
    SpendingReport, SpendingTrend, SAVINGS_TARGET,
};
pub use csv::{parse_csv, read_csv, to_csv_string, write_csv, CSV_HEADER};
pub use sample::{SampleDataGenerator, MAX_SAMPLE_MONTHS};
pub use transaction::{load_file, load_json, save_json, Transaction, TransactionKind};
