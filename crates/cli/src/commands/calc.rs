use crate::output::{self, money, percent};
use crate::AppContext;
use anyhow::{Context, Result};
use calculators::{
    compare_investments, compare_systems, compound_interest, finance_purchase,
    future_value, internal_rate_of_return, net_present_value, plan_retirement, present_value,
    project_retirement, simulate_loan, AmortizationSystem, InvestmentOption, LoanSchedule,
    RetirementGoal,
};
use clap::{Args, Subcommand};
use colored::*;
use prettytable::row;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Args)]
pub struct CalcCommand {
    /// Salvar a simulação no histórico do usuário
    #[arg(long, global = true)]
    save: bool,

    /// Usuário para --save (padrão: user.default_user)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Resultado completo em JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: CalcSubcommand,
}

#[derive(Debug, Clone, Subcommand)]
enum CalcSubcommand {
    /// Financiamento SAC ou Price
    #[command(name = "loan")]
    Loan {
        amount: f64,
        /// Taxa anual em %
        rate: f64,
        months: u32,
        #[arg(short, long, default_value = "price")]
        system: AmortizationSystem,
        /// Mostrar todas as parcelas
        #[arg(long)]
        schedule: bool,
    },
    /// Compra financiada com entrada
    #[command(name = "purchase")]
    Purchase {
        value: f64,
        down_payment: f64,
        months: u32,
        rate: f64,
        #[arg(short, long, default_value = "price")]
        system: AmortizationSystem,
    },
    /// SAC x Price para o mesmo empréstimo
    #[command(name = "compare")]
    Compare { amount: f64, rate: f64, months: u32 },
    /// Juros compostos com aportes mensais
    #[command(name = "invest")]
    Invest {
        principal: f64,
        rate: f64,
        months: u32,
        #[arg(short, long, default_value_t = 0.0)]
        contribution: f64,
    },
    /// Comparar aplicações, cada opção como NOME=TAXA
    #[command(name = "invest-compare")]
    InvestCompare {
        amount: f64,
        months: u32,
        #[arg(required = true, value_parser = parse_option)]
        options: Vec<InvestmentOption>,
    },
    /// Projeção de aposentadoria com aporte fixo
    #[command(name = "retire")]
    Retire {
        current_age: u32,
        retirement_age: u32,
        #[arg(short, long, default_value_t = 0.0)]
        contribution: f64,
        /// Retorno anual esperado em %
        #[arg(short = 'r', long = "return", default_value_t = 8.0)]
        expected_return: f64,
        #[arg(long, default_value_t = 0.0)]
        savings: f64,
    },
    /// Quanto poupar para uma renda desejada na aposentadoria
    #[command(name = "plan")]
    Plan {
        current_age: u32,
        retirement_age: u32,
        desired_income: f64,
        #[arg(long, default_value_t = 0.0)]
        savings: f64,
        #[arg(short = 'r', long = "return", default_value_t = 8.0)]
        annual_return: f64,
        #[arg(long, default_value_t = 4.0)]
        inflation: f64,
        #[arg(long, default_value_t = 85)]
        life_expectancy: u32,
    },
    /// Valor presente
    #[command(name = "pv")]
    Pv { future_value: f64, rate: f64, years: u32 },
    /// Valor futuro
    #[command(name = "fv")]
    Fv { present_value: f64, rate: f64, years: u32 },
    /// VPL; o primeiro fluxo é o período zero
    #[command(name = "npv", allow_negative_numbers = true)]
    Npv {
        rate: f64,
        #[arg(required = true, num_args = 2..)]
        flows: Vec<f64>,
    },
    /// TIR em % por período
    #[command(name = "irr", allow_negative_numbers = true)]
    Irr {
        #[arg(required = true, num_args = 2..)]
        flows: Vec<f64>,
    },
}

fn parse_option(raw: &str) -> Result<InvestmentOption, String> {
    let (name, rate) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=RATE, got '{raw}'"))?;
    let rate: f64 = rate
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("invalid rate in '{raw}'"))?;
    Ok(InvestmentOption::new(name.trim(), rate))
}

/// Одна выполненная симуляция: вид, параметры и результат для сохранения
#[derive(Debug)]
struct Simulation {
    kind: &'static str,
    params: Value,
    result: Value,
}

impl Simulation {
    fn new<R: Serialize>(kind: &'static str, params: Value, result: &R) -> Result<Self> {
        Ok(Self {
            kind,
            params,
            result: serde_json::to_value(result)?,
        })
    }
}

impl CalcCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let simulation = run(self.command, self.json)?;

        if self.save {
            let user = ctx.resolve_user(self.user.as_deref());
            let store = ctx.open_store().await?;
            store.create_user(&user, None, None).await?;
            let id = store
                .save_simulation(&user, simulation.kind, &simulation.params, &simulation.result)
                .await
                .context("Failed to save simulation")?;
            let saved = format!("Simulação #{id} salva para {user}");
            if self.json {
                output::notice(&saved);
            } else {
                output::success(&saved);
            }
        }
        Ok(())
    }
}

fn run(cmd: CalcSubcommand, as_json: bool) -> Result<Simulation> {
    let simulation = match cmd {
        CalcSubcommand::Loan {
            amount,
            rate,
            months,
            system,
            schedule,
        } => {
            let result = simulate_loan(amount, rate, months, system)?;
            if !as_json {
                print_loan(&result, schedule);
            }
            Simulation::new(
                "loan",
                json!({"amount": amount, "rate": rate, "months": months, "system": system}),
                &result,
            )?
        }
        CalcSubcommand::Purchase {
            value,
            down_payment,
            months,
            rate,
            system,
        } => {
            let result = finance_purchase(value, down_payment, months, rate, system)?;
            if !as_json {
                output::header("Financiamento de bem");
                output::field("valor do bem", money(result.asset_value));
                output::field("entrada", money(result.down_payment));
                print_loan(&result.schedule, false);
            }
            Simulation::new(
                "purchase",
                json!({"value": value, "down_payment": down_payment, "months": months, "rate": rate, "system": system}),
                &result,
            )?
        }
        CalcSubcommand::Compare {
            amount,
            rate,
            months,
        } => {
            let result = compare_systems(amount, rate, months)?;
            if !as_json {
                output::header("SAC x Price");
                let mut table = output::new_table();
                table.set_titles(row!["", "SAC", "Price"]);
                table.add_row(row![
                    "1ª parcela",
                    money(result.sac.first_payment),
                    money(result.price.first_payment)
                ]);
                table.add_row(row![
                    "Última parcela",
                    money(result.sac.last_payment),
                    money(result.price.last_payment)
                ]);
                table.add_row(row![
                    "Total pago",
                    money(result.sac.total_paid),
                    money(result.price.total_paid)
                ]);
                table.add_row(row![
                    "Juros",
                    money(result.sac.total_interest),
                    money(result.price.total_interest)
                ]);
                table.printstd();
                println!(
                    "{} Economia de juros com SAC: {}",
                    "Σ".yellow(),
                    money(result.interest_saved_with_sac).bold()
                );
            }
            Simulation::new(
                "compare",
                json!({"amount": amount, "rate": rate, "months": months}),
                &result,
            )?
        }
        CalcSubcommand::Invest {
            principal,
            rate,
            months,
            contribution,
        } => {
            let result = compound_interest(principal, rate, months, contribution)?;
            if !as_json {
                output::header("Juros compostos");
                output::field("valor final", money(result.final_amount).green().bold());
                output::field("total investido", money(result.total_invested));
                output::field("juros", money(result.total_interest));
                output::field("rentabilidade", percent(result.return_percentage));

                let timeline = result.yearly_timeline();
                if !timeline.is_empty() {
                    let mut table = output::new_table();
                    table.set_titles(row!["Ano", "Saldo", "Investido", "Juros"]);
                    for year in timeline {
                        table.add_row(row![
                            year.year,
                            money(year.balance),
                            money(year.total_invested),
                            money(year.total_interest)
                        ]);
                    }
                    table.printstd();
                }
            }
            Simulation::new(
                "investment",
                json!({"principal": principal, "rate": rate, "months": months, "contribution": contribution}),
                &result,
            )?
        }
        CalcSubcommand::InvestCompare {
            amount,
            months,
            options,
        } => {
            let result = compare_investments(amount, months, &options)?;
            if !as_json {
                let mut table = output::new_table();
                table.set_titles(row!["#", "Aplicação", "Taxa a.a.", "Valor final", "Retorno"]);
                for (i, r) in result.iter().enumerate() {
                    table.add_row(row![
                        i + 1,
                        r.name,
                        percent(r.annual_rate),
                        money(r.final_amount),
                        percent(r.return_percentage)
                    ]);
                }
                table.printstd();
            }
            Simulation::new(
                "investment_comparison",
                json!({"amount": amount, "months": months, "options": options}),
                &result,
            )?
        }
        CalcSubcommand::Retire {
            current_age,
            retirement_age,
            contribution,
            expected_return,
            savings,
        } => {
            let result = project_retirement(
                current_age,
                retirement_age,
                contribution,
                expected_return,
                savings,
            )?;
            if !as_json {
                output::header("Projeção de aposentadoria");
                output::field("anos até aposentar", result.years_until_retirement);
                output::field("total aportado", money(result.total_contributions));
                output::field("rendimentos", money(result.investment_growth));
                output::field("patrimônio final", money(result.retirement_fund).green().bold());
                output::field("renda mensal estimada", money(result.estimated_monthly_income));
            }
            Simulation::new(
                "retirement",
                json!({"current_age": current_age, "retirement_age": retirement_age, "contribution": contribution, "expected_return": expected_return, "savings": savings}),
                &result,
            )?
        }
        CalcSubcommand::Plan {
            current_age,
            retirement_age,
            desired_income,
            savings,
            annual_return,
            inflation,
            life_expectancy,
        } => {
            let goal = RetirementGoal {
                current_savings: savings,
                annual_return,
                inflation,
                life_expectancy,
                ..RetirementGoal::new(current_age, retirement_age, desired_income)
            };
            let result = plan_retirement(&goal)?;
            if !as_json {
                output::header("Plano de aposentadoria");
                output::field("capital necessário", money(result.capital_needed));
                output::field(
                    "poupança mensal",
                    money(result.monthly_saving_required).green().bold(),
                );
                output::field("anos de acumulação", result.years_until_retirement);
                output::field("anos de usufruto", result.years_in_retirement);
                output::field("taxa real a.a.", percent(result.real_rate));
            }
            Simulation::new("retirement_plan", serde_json::to_value(&goal)?, &result)?
        }
        CalcSubcommand::Pv {
            future_value: fv,
            rate,
            years,
        } => {
            let value = present_value(fv, rate, years);
            if !as_json {
                output::field("valor presente", money(value));
            }
            Simulation::new(
                "present_value",
                json!({"future_value": fv, "rate": rate, "years": years}),
                &value,
            )?
        }
        CalcSubcommand::Fv {
            present_value: pv,
            rate,
            years,
        } => {
            let value = future_value(pv, rate, years);
            if !as_json {
                output::field("valor futuro", money(value));
            }
            Simulation::new(
                "future_value",
                json!({"present_value": pv, "rate": rate, "years": years}),
                &value,
            )?
        }
        CalcSubcommand::Npv { rate, flows } => {
            let value = net_present_value(&flows, rate);
            if !as_json {
                let verdict = if value >= 0.0 {
                    "viável".green()
                } else {
                    "inviável".red()
                };
                output::field("VPL", format!("{} ({})", money(value), verdict));
            }
            Simulation::new("npv", json!({"rate": rate, "flows": flows}), &value)?
        }
        CalcSubcommand::Irr { flows } => {
            let value = internal_rate_of_return(&flows)?;
            if !as_json {
                output::field("TIR", percent(value));
            }
            Simulation::new("irr", json!({"flows": flows}), &value)?
        }
    };

    if as_json {
        output::print_json(&simulation.result)?;
    }
    Ok(simulation)
}

fn print_loan(schedule: &LoanSchedule, full: bool) {
    output::header(&format!("Financiamento {}", schedule.system));
    output::field("valor financiado", money(schedule.loan_amount));
    match schedule.system {
        AmortizationSystem::Price => {
            output::field("parcela fixa", money(schedule.monthly_payment).bold());
        }
        AmortizationSystem::Sac => {
            output::field("primeira parcela", money(schedule.first_payment).bold());
            output::field("última parcela", money(schedule.last_payment));
        }
    }
    output::field("total pago", money(schedule.total_paid));
    output::field("total de juros", money(schedule.total_interest).yellow());

    if full {
        let mut table = output::new_table();
        table.set_titles(row!["Nº", "Parcela", "Amortização", "Juros", "Saldo"]);
        for i in &schedule.installments {
            table.add_row(row![
                i.number,
                money(i.payment),
                money(i.principal),
                money(i.interest),
                money(i.balance)
            ]);
        }
        table.printstd();
    }
}
