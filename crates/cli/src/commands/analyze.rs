use crate::output::{self, money, percent};
use analysis::{
    load_file, save_json, write_csv, FinancialDataAnalyzer, InsightLevel, SampleDataGenerator,
    Transaction,
};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use prettytable::row;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    /// Arquivo de transações (JSON ou CSV); sem ele usa dados de exemplo
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Meses de dados de exemplo
    #[arg(long, default_value_t = 6, global = true)]
    months: u32,

    /// Semente para dados de exemplo reproduzíveis
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Resultado em JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: AnalyzeSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum AnalyzeSubcommand {
    /// Gerar transações de exemplo e salvar (.json ou .csv)
    #[command(name = "sample")]
    Sample { output: PathBuf },
    /// Resumo financeiro
    #[command(name = "summary")]
    Summary,
    /// Recomendações automáticas
    #[command(name = "insights")]
    Insights,
    /// Evolução mensal de receitas e despesas
    #[command(name = "trend")]
    Trend,
    /// Relatório de gastos por categoria
    #[command(name = "report")]
    Report,
    /// Despesas fora do padrão da categoria
    #[command(name = "anomalies")]
    Anomalies {
        /// Número de desvios-padrão
        #[arg(short, long, default_value_t = 2.0)]
        deviations: f64,
    },
    /// Indicadores das despesas
    #[command(name = "kpis")]
    Kpis,
    /// Exportar transações em CSV
    #[command(name = "export")]
    Export { output: PathBuf },
}

impl AnalyzeCommand {
    pub async fn execute(self) -> Result<()> {
        let transactions = self.load_transactions()?;

        if let AnalyzeSubcommand::Sample { output: path } = &self.command {
            write_transactions(path, &transactions)?;
            output::success(&format!(
                "{} transações salvas em {}",
                transactions.len(),
                path.display()
            ));
            return Ok(());
        }

        let analyzer = FinancialDataAnalyzer::new(transactions);
        report(&analyzer, self.command, self.json)
    }

    fn load_transactions(&self) -> Result<Vec<Transaction>> {
        match &self.file {
            Some(path) if !matches!(self.command, AnalyzeSubcommand::Sample { .. }) => {
                let transactions = load_file(path)
                    .with_context(|| format!("Failed to load transactions from {}", path.display()))?;
                info!(count = transactions.len(), path = %path.display(), "Transactions loaded");
                Ok(transactions)
            }
            _ => {
                let mut generator = match self.seed {
                    Some(seed) => SampleDataGenerator::seeded(seed),
                    None => SampleDataGenerator::new(),
                };
                Ok(generator.generate(self.months)?)
            }
        }
    }
}

fn write_transactions(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(path, transactions)?;
    } else {
        save_json(path, transactions)?;
    }
    Ok(())
}

/// `null` on stdout in JSON mode, the message goes to stderr
fn no_data(message: &str, as_json: bool) -> Result<()> {
    if as_json {
        output::notice(message);
        return output::print_json(&serde_json::Value::Null);
    }
    output::failure(message);
    Ok(())
}

fn report(analyzer: &FinancialDataAnalyzer, cmd: AnalyzeSubcommand, as_json: bool) -> Result<()> {
    match cmd {
        AnalyzeSubcommand::Sample { .. } => {}
        AnalyzeSubcommand::Summary => {
            let Some(summary) = analyzer.summary() else {
                return no_data("Nenhuma transação carregada", as_json);
            };
            if as_json {
                return output::print_json(&summary);
            }
            output::header("Resumo financeiro");
            output::field("receitas", money(summary.total_income).green());
            output::field("despesas", money(summary.total_expense).red());
            output::field("saldo", money(summary.balance).bold());
            output::field("taxa de poupança", percent(summary.savings_rate));
            output::field("transações", summary.transaction_count);
            output::field("despesa média", money(summary.avg_expense));

            let by_category = analyzer.expenses_by_category();
            if !by_category.is_empty() {
                output::header("Despesas por categoria:");
                let mut table = output::new_table();
                table.set_titles(row!["Categoria", "Total", "%"]);
                let mut rows: Vec<_> = by_category.into_iter().collect();
                rows.sort_by(|a, b| b.1.total_cmp(&a.1));
                for (category, total) in rows {
                    let share = if summary.total_expense > 0.0 {
                        total / summary.total_expense * 100.0
                    } else {
                        0.0
                    };
                    table.add_row(row![category, money(total), percent(share)]);
                }
                table.printstd();
            }
        }
        AnalyzeSubcommand::Insights => {
            let insights = analyzer.insights();
            if as_json {
                return output::print_json(&insights);
            }
            output::header("Insights");
            for insight in insights {
                let marker = match insight.level {
                    InsightLevel::Positive => "✓".green(),
                    InsightLevel::Warning => "!".yellow(),
                    InsightLevel::Alert => "✗".red(),
                    InsightLevel::Info => "ℹ".blue(),
                };
                println!("  {} {}", marker, insight.message);
            }
        }
        AnalyzeSubcommand::Trend => {
            let points = analyzer.monthly_trend();
            if as_json {
                return output::print_json(&points);
            }
            let mut table = output::new_table();
            table.set_titles(row!["Mês", "Receitas", "Despesas", "Saldo"]);
            for p in &points {
                let balance = if p.balance < 0.0 {
                    money(p.balance).red()
                } else {
                    money(p.balance).normal()
                };
                table.add_row(row![p.month, money(p.income), money(p.expense), balance]);
            }
            table.printstd();
            println!(
                "{} Tendência de gastos: {}",
                "Σ".yellow(),
                analyzer.spending_report().trend
            );
        }
        AnalyzeSubcommand::Report => {
            let report = analyzer.spending_report();
            if as_json {
                return output::print_json(&report);
            }
            output::header("Relatório de gastos");
            if let Some(period) = &report.period {
                output::field("período", period);
            }
            output::field("total gasto", money(report.total_spent));
            output::field("média mensal", money(report.monthly_mean));
            output::field("tendência", report.trend);
            let mut table = output::new_table();
            table.set_titles(row!["Categoria", "Total"]);
            for (category, total) in &report.by_category {
                table.add_row(row![category, money(*total)]);
            }
            table.printstd();
        }
        AnalyzeSubcommand::Anomalies { deviations } => {
            let anomalies = analyzer.detect_anomalies(deviations);
            if as_json {
                return output::print_json(&anomalies);
            }
            if anomalies.is_empty() {
                output::success("Nenhuma despesa fora do padrão");
                return Ok(());
            }
            let mut table = output::new_table();
            table.set_titles(row!["Data", "Categoria", "Valor", "Média", "Desvio"]);
            for a in anomalies {
                table.add_row(row![
                    a.transaction.date.format("%d/%m/%Y"),
                    a.transaction.category,
                    money(a.transaction.amount).red(),
                    money(a.category_mean),
                    money(a.category_std)
                ]);
            }
            table.printstd();
        }
        AnalyzeSubcommand::Kpis => {
            let Some(kpis) = analyzer.kpis() else {
                return no_data("Nenhuma despesa para calcular indicadores", as_json);
            };
            if as_json {
                return output::print_json(&kpis);
            }
            output::header("Indicadores de despesas");
            output::field("total", money(kpis.total));
            output::field("média", money(kpis.mean));
            output::field("mediana", money(kpis.median));
            output::field("máximo", money(kpis.max));
            output::field("mínimo", money(kpis.min));
            output::field("quantidade", kpis.count);
            output::field("desvio padrão", money(kpis.std_dev));
        }
        AnalyzeSubcommand::Export { output: path } => {
            analyzer.export_csv(&path)?;
            output::success(&format!("Transações exportadas para {}", path.display()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::read_csv;
    use chrono::NaiveDate;

    #[test]
    fn test_write_transactions_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let transactions = vec![
            Transaction::income(date, 5000.0, "Salário", "Salário mensal"),
            Transaction::expense(date, 120.5, "Alimentação", "Mercado, feira"),
        ];

        let csv_path = dir.path().join("tx.CSV");
        write_transactions(&csv_path, &transactions).unwrap();
        assert_eq!(read_csv(&csv_path).unwrap(), transactions);

        let json_path = dir.path().join("tx.json");
        write_transactions(&json_path, &transactions).unwrap();
        assert_eq!(load_file(&json_path).unwrap(), transactions);
    }

    #[test]
    fn test_export_without_transactions_fails() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = FinancialDataAnalyzer::new(Vec::new());
        let result = report(
            &analyzer,
            AnalyzeSubcommand::Export {
                output: dir.path().join("out.csv"),
            },
            false,
        );
        assert!(result.is_err());
    }
}
