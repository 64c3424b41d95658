use crate::{monthly_rate, MAX_MONTHS};
use common::{invalid_input, FinanceResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Состояние вклада на конец месяца
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub month: u32,
    pub contribution: f64,
    pub interest: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyBalance {
    pub year: u32,
    pub balance: f64,
    pub total_invested: f64,
    pub total_interest: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentProjection {
    pub initial_amount: f64,
    pub monthly_contribution: f64,
    pub annual_rate: f64,
    pub months: u32,
    pub final_amount: f64,
    pub total_invested: f64,
    pub total_interest: f64,
    /// total_interest / total_invested * 100, zero when nothing was invested
    pub return_percentage: f64,
    pub monthly_breakdown: Vec<MonthlyBalance>,
}

impl InvestmentProjection {
    /// Снимок баланса каждые 12 месяцев
    pub fn yearly_timeline(&self) -> Vec<YearlyBalance> {
        let mut invested = self.initial_amount;
        let mut timeline = Vec::with_capacity(self.monthly_breakdown.len() / 12);

        for entry in &self.monthly_breakdown {
            invested += entry.contribution;
            if entry.month % 12 == 0 {
                timeline.push(YearlyBalance {
                    year: entry.month / 12,
                    balance: entry.balance,
                    total_invested: invested,
                    total_interest: entry.balance - invested,
                });
            }
        }
        timeline
    }
}

/// Сложные проценты с ежемесячными взносами.
///
/// Interest accrues on the opening balance each month; the contribution is
/// deposited at the end of every month except the last one, so a 12-month
/// plan receives 11 contributions.
pub fn compound_interest(
    principal: f64,
    annual_rate: f64,
    months: u32,
    contribution: f64,
) -> FinanceResult<InvestmentProjection> {
    if !(principal >= 0.0) {
        return Err(invalid_input("principal", "must not be negative"));
    }
    if !(annual_rate >= 0.0) {
        return Err(invalid_input("annual_rate", "must not be negative"));
    }
    if !(contribution >= 0.0) {
        return Err(invalid_input("contribution", "must not be negative"));
    }
    if months > MAX_MONTHS {
        return Err(invalid_input(
            "months",
            &format!("must not exceed {MAX_MONTHS}"),
        ));
    }

    let rate = monthly_rate(annual_rate);
    let mut balance = principal;
    let mut total_invested = principal;
    let mut monthly_breakdown = Vec::with_capacity(months as usize);

    for month in 1..=months {
        let interest = balance * rate;
        balance += interest;

        let deposit = if month < months { contribution } else { 0.0 };
        balance += deposit;
        total_invested += deposit;

        monthly_breakdown.push(MonthlyBalance {
            month,
            contribution: deposit,
            interest,
            balance,
        });
    }

    let total_interest = balance - total_invested;
    let return_percentage = if total_invested > 0.0 {
        total_interest / total_invested * 100.0
    } else {
        0.0
    };

    debug!(months, final_amount = balance, "Investment projected");

    Ok(InvestmentProjection {
        initial_amount: principal,
        monthly_contribution: contribution,
        annual_rate,
        months,
        final_amount: balance,
        total_invested,
        total_interest,
        return_percentage,
        monthly_breakdown,
    })
}

/// Closed-form future value with a per-period rate given as a fraction.
///
/// `P(1+r)^n + c((1+r)^n - 1)/r`; with `r == 0` the contributions add up linearly.
pub fn closed_form_compound(principal: f64, rate: f64, periods: u32, contribution: f64) -> f64 {
    let growth = (1.0 + rate).powi(periods as i32);
    let from_principal = principal * growth;

    if contribution == 0.0 {
        from_principal
    } else if rate == 0.0 {
        from_principal + contribution * periods as f64
    } else {
        from_principal + contribution * (growth - 1.0) / rate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentOption {
    pub name: String,
    pub annual_rate: f64,
}

impl InvestmentOption {
    pub fn new(name: &str, annual_rate: f64) -> Self {
        Self {
            name: name.to_string(),
            annual_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentComparison {
    pub name: String,
    pub annual_rate: f64,
    pub final_amount: f64,
    pub total_return: f64,
    pub return_percentage: f64,
}

/// Сравнение вариантов вложения одной суммы, лучший первым
pub fn compare_investments(
    amount: f64,
    months: u32,
    options: &[InvestmentOption],
) -> FinanceResult<Vec<InvestmentComparison>> {
    if !(amount > 0.0) {
        return Err(invalid_input("amount", "must be greater than zero"));
    }

    let mut results = options
        .iter()
        .map(|option| {
            let projection = compound_interest(amount, option.annual_rate, months, 0.0)?;
            Ok(InvestmentComparison {
                name: option.name.clone(),
                annual_rate: option.annual_rate,
                final_amount: projection.final_amount,
                total_return: projection.total_interest,
                return_percentage: projection.total_interest / amount * 100.0,
            })
        })
        .collect::<FinanceResult<Vec<_>>>()?;

    results.sort_by(|a, b| b.final_amount.total_cmp(&a.final_amount));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_skipped_in_last_month() {
        let projection = compound_interest(0.0, 0.0, 3, 100.0).unwrap();
        assert_eq!(projection.total_invested, 200.0);
        assert_eq!(projection.monthly_breakdown[2].contribution, 0.0);
        assert_eq!(projection.return_percentage, 0.0);
    }

    #[test]
    fn test_yearly_timeline() {
        let projection = compound_interest(1000.0, 12.0, 30, 50.0).unwrap();
        let timeline = projection.yearly_timeline();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].year, 1);
        assert!((timeline[0].total_invested - 1600.0).abs() < 1e-9);
        assert_eq!(timeline[1].balance, projection.monthly_breakdown[23].balance);
    }

    #[test]
    fn test_closed_form() {
        assert!((closed_form_compound(1000.0, 0.1, 2, 0.0) - 1210.0).abs() < 1e-9);
        assert!((closed_form_compound(0.0, 0.1, 2, 100.0) - 210.0).abs() < 1e-9);
        assert!((closed_form_compound(100.0, 0.0, 5, 10.0) - 150.0).abs() < 1e-9);
    }
}
