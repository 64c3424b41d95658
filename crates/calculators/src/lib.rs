//! Financial calculators: loan amortization (SAC and Price), compound
//! interest, retirement planning and discounted cash flows.
//!
//! Rates are annual percentages unless a function says otherwise. Results
//! derive `Serialize` so simulations can be persisted as JSON.

pub mod cashflow;
pub mod investment;
pub mod loan;
pub mod retirement;

pub use cashflow::{future_value, internal_rate_of_return, net_present_value, present_value};
pub use investment::{
    closed_form_compound, compare_investments, compound_interest, InvestmentComparison,
    InvestmentOption, InvestmentProjection, MonthlyBalance, YearlyBalance,
};
pub use loan::{
    compare_systems, finance_purchase, price_payment, simulate_loan, AmortizationSystem,
    Installment, LoanSchedule, PurchaseFinancing, SystemComparison,
};
pub use retirement::{
    plan_retirement, project_retirement, RetirementGoal, RetirementPlan, RetirementProjection,
    SAFE_WITHDRAWAL_RATE,
};

/// 100 years; longer horizons are rejected instead of allocating huge schedules
pub const MAX_MONTHS: u32 = 1200;
pub const MAX_AGE: u32 = 150;

pub(crate) fn check_months(field: &str, months: u32) -> common::FinanceResult<()> {
    if months == 0 {
        return Err(common::invalid_input(field, "must be at least one"));
    }
    if months > MAX_MONTHS {
        return Err(common::invalid_input(
            field,
            &format!("must not exceed {MAX_MONTHS}"),
        ));
    }
    Ok(())
}

pub(crate) fn check_age(field: &str, age: u32) -> common::FinanceResult<()> {
    if age > MAX_AGE {
        return Err(common::invalid_input(field, &format!("must not exceed {MAX_AGE}")));
    }
    Ok(())
}

/// Annual percentage -> monthly fraction (12% -> 0.01)
pub fn monthly_rate(annual_rate: f64) -> f64 {
    annual_rate / 100.0 / 12.0
}
