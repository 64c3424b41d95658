use crate::check_age;
use crate::investment::compound_interest;
use common::{invalid_input, CalculationError, FinanceResult};
use serde::{Deserialize, Serialize};

/// Safe withdrawal rate used to turn a fund into monthly income
pub const SAFE_WITHDRAWAL_RATE: f64 = 0.04;

/// Прогноз накоплений к пенсии при фиксированном взносе
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementProjection {
    pub years_until_retirement: u32,
    pub total_contributions: f64,
    pub investment_growth: f64,
    pub retirement_fund: f64,
    pub estimated_monthly_income: f64,
    pub total_return_percentage: f64,
}

pub fn project_retirement(
    current_age: u32,
    retirement_age: u32,
    monthly_contribution: f64,
    expected_return: f64,
    current_savings: f64,
) -> FinanceResult<RetirementProjection> {
    check_age("retirement_age", retirement_age)?;
    if retirement_age <= current_age {
        return Err(CalculationError::InvalidAgeRange {
            current: current_age,
            retirement: retirement_age,
        }
        .into());
    }

    let years = retirement_age - current_age;
    let projection = compound_interest(
        current_savings,
        expected_return,
        years * 12,
        monthly_contribution,
    )?;

    let total_return_percentage = if projection.total_invested > 0.0 {
        projection.total_interest / projection.total_invested * 100.0
    } else {
        0.0
    };

    Ok(RetirementProjection {
        years_until_retirement: years,
        total_contributions: projection.total_invested,
        investment_growth: projection.total_interest,
        retirement_fund: projection.final_amount,
        estimated_monthly_income: projection.final_amount * SAFE_WITHDRAWAL_RATE / 12.0,
        total_return_percentage,
    })
}

/// Цель: желаемый ежемесячный доход на пенсии (в сегодняшних деньгах)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementGoal {
    pub current_age: u32,
    pub retirement_age: u32,
    pub desired_income: f64,
    pub current_savings: f64,
    /// Expected nominal return, percent per year
    pub annual_return: f64,
    /// Expected inflation, percent per year
    pub inflation: f64,
    pub life_expectancy: u32,
}

impl RetirementGoal {
    pub fn new(current_age: u32, retirement_age: u32, desired_income: f64) -> Self {
        Self {
            current_age,
            retirement_age,
            desired_income,
            current_savings: 0.0,
            annual_return: 8.0,
            inflation: 4.0,
            life_expectancy: 85,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementPlan {
    pub capital_needed: f64,
    pub monthly_saving_required: f64,
    pub years_until_retirement: u32,
    pub years_in_retirement: u32,
    pub total_to_invest: f64,
    /// Real annual rate in percent, net of inflation
    pub real_rate: f64,
}

/// Сколько нужно откладывать, чтобы получать `desired_income` до конца жизни.
///
/// All amounts are in today's money, so growth uses the real (inflation
/// adjusted) rate both before and after retirement.
pub fn plan_retirement(goal: &RetirementGoal) -> FinanceResult<RetirementPlan> {
    check_age("life_expectancy", goal.life_expectancy)?;
    if goal.retirement_age <= goal.current_age {
        return Err(CalculationError::InvalidAgeRange {
            current: goal.current_age,
            retirement: goal.retirement_age,
        }
        .into());
    }
    if goal.life_expectancy <= goal.retirement_age {
        return Err(invalid_input(
            "life_expectancy",
            "must be greater than the retirement age",
        ));
    }
    if !(goal.desired_income > 0.0) {
        return Err(invalid_input("desired_income", "must be greater than zero"));
    }
    if !(goal.current_savings >= 0.0) {
        return Err(invalid_input("current_savings", "must not be negative"));
    }
    if !(goal.inflation > -100.0) {
        return Err(invalid_input("inflation", "must be greater than -100%"));
    }

    let years_until_retirement = goal.retirement_age - goal.current_age;
    let years_in_retirement = goal.life_expectancy - goal.retirement_age;
    // ages are capped, so these fit in i32
    let saving_months = (years_until_retirement * 12) as i32;
    let retired_months = (years_in_retirement * 12) as i32;

    let real_rate =
        ((1.0 + goal.annual_return / 100.0) / (1.0 + goal.inflation / 100.0) - 1.0) * 100.0;
    let rate = real_rate / 100.0 / 12.0;

    let capital_needed = if rate.abs() < 1e-12 {
        goal.desired_income * retired_months as f64
    } else {
        goal.desired_income * (1.0 - (1.0 + rate).powi(-retired_months)) / rate
    };

    let monthly_saving_required = if rate.abs() < 1e-12 {
        ((capital_needed - goal.current_savings) / saving_months as f64).max(0.0)
    } else {
        let grown_savings = goal.current_savings * (1.0 + rate).powi(saving_months);
        let shortfall = capital_needed - grown_savings;
        if shortfall > 0.0 {
            shortfall / (((1.0 + rate).powi(saving_months) - 1.0) / rate)
        } else {
            0.0
        }
    };

    Ok(RetirementPlan {
        capital_needed,
        monthly_saving_required,
        years_until_retirement,
        years_in_retirement,
        total_to_invest: monthly_saving_required * saving_months as f64 + goal.current_savings,
        real_rate,
    })
}
