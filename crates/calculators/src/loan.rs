use crate::{check_months, monthly_rate};
use common::{invalid_input, CalculationError, FinanceResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Система амортизации кредита
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AmortizationSystem {
    /// Sistema de Amortização Constante: fixed principal, decreasing payments
    Sac,
    /// Tabela Price: fixed payment
    Price,
}

impl std::fmt::Display for AmortizationSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmortizationSystem::Sac => write!(f, "SAC"),
            AmortizationSystem::Price => write!(f, "PRICE"),
        }
    }
}

impl std::str::FromStr for AmortizationSystem {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SAC" => Ok(AmortizationSystem::Sac),
            "PRICE" => Ok(AmortizationSystem::Price),
            _ => Err(CalculationError::UnknownSystem(s.to_string())),
        }
    }
}

/// Одна строка графика платежей
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub number: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    /// Outstanding balance after this payment, never negative
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub system: AmortizationSystem,
    pub loan_amount: f64,
    pub annual_rate: f64,
    pub months: u32,
    /// Fixed payment for Price, average payment for SAC
    pub monthly_payment: f64,
    pub first_payment: f64,
    pub last_payment: f64,
    pub total_paid: f64,
    pub total_interest: f64,
    pub installments: Vec<Installment>,
}

/// Financiamento com entrada: valor do bem menos a entrada
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseFinancing {
    pub asset_value: f64,
    pub down_payment: f64,
    pub schedule: LoanSchedule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemComparison {
    pub sac: LoanSchedule,
    pub price: LoanSchedule,
    /// Positive when SAC pays less interest than Price
    pub interest_saved_with_sac: f64,
}

/// Считает график платежей по выбранной системе
pub fn simulate_loan(
    loan_amount: f64,
    annual_rate: f64,
    months: u32,
    system: AmortizationSystem,
) -> FinanceResult<LoanSchedule> {
    if !(loan_amount > 0.0) {
        return Err(invalid_input("loan_amount", "must be greater than zero"));
    }
    if !(annual_rate >= 0.0) {
        return Err(invalid_input("annual_rate", "must not be negative"));
    }
    check_months("months", months)?;

    let rate = monthly_rate(annual_rate);
    let installments = match system {
        AmortizationSystem::Sac => sac_installments(loan_amount, rate, months),
        AmortizationSystem::Price => price_installments(loan_amount, rate, months),
    };

    let total_paid: f64 = installments.iter().map(|i| i.payment).sum();
    let first_payment = installments.first().map(|i| i.payment).unwrap_or_default();
    let last_payment = installments.last().map(|i| i.payment).unwrap_or_default();
    let monthly_payment = match system {
        AmortizationSystem::Price => first_payment,
        AmortizationSystem::Sac => total_paid / months as f64,
    };

    debug!(
        system = %system,
        loan_amount,
        months,
        total_paid,
        "Loan schedule computed"
    );

    Ok(LoanSchedule {
        system,
        loan_amount,
        annual_rate,
        months,
        monthly_payment,
        first_payment,
        last_payment,
        total_paid,
        total_interest: total_paid - loan_amount,
        installments,
    })
}

fn sac_installments(amount: f64, rate: f64, months: u32) -> Vec<Installment> {
    let principal = amount / months as f64;
    let mut balance = amount;

    (1..=months)
        .map(|number| {
            let interest = balance * rate;
            balance -= principal;
            Installment {
                number,
                payment: principal + interest,
                principal,
                interest,
                balance: balance.max(0.0),
            }
        })
        .collect()
}

/// PMT = PV * i(1+i)^n / ((1+i)^n - 1)
pub fn price_payment(amount: f64, rate: f64, months: u32) -> f64 {
    if rate == 0.0 {
        return amount / months as f64;
    }
    let factor = (1.0 + rate).powi(months as i32);
    amount * rate * factor / (factor - 1.0)
}

fn price_installments(amount: f64, rate: f64, months: u32) -> Vec<Installment> {
    let payment = price_payment(amount, rate, months);
    let mut balance = amount;

    (1..=months)
        .map(|number| {
            let interest = balance * rate;
            let principal = payment - interest;
            balance -= principal;
            Installment {
                number,
                payment,
                principal,
                interest,
                balance: balance.max(0.0),
            }
        })
        .collect()
}

/// Финансирование покупки с первоначальным взносом
pub fn finance_purchase(
    asset_value: f64,
    down_payment: f64,
    months: u32,
    annual_rate: f64,
    system: AmortizationSystem,
) -> FinanceResult<PurchaseFinancing> {
    if !(asset_value > 0.0) {
        return Err(invalid_input("asset_value", "must be greater than zero"));
    }
    if !(down_payment >= 0.0) {
        return Err(invalid_input("down_payment", "must not be negative"));
    }
    if down_payment >= asset_value {
        return Err(CalculationError::DownPaymentTooHigh {
            down_payment,
            value: asset_value,
        }
        .into());
    }

    let schedule = simulate_loan(asset_value - down_payment, annual_rate, months, system)?;
    Ok(PurchaseFinancing {
        asset_value,
        down_payment,
        schedule,
    })
}

pub fn compare_systems(
    loan_amount: f64,
    annual_rate: f64,
    months: u32,
) -> FinanceResult<SystemComparison> {
    let sac = simulate_loan(loan_amount, annual_rate, months, AmortizationSystem::Sac)?;
    let price = simulate_loan(loan_amount, annual_rate, months, AmortizationSystem::Price)?;
    let interest_saved_with_sac = price.total_interest - sac.total_interest;

    Ok(SystemComparison {
        sac,
        price,
        interest_saved_with_sac,
    })
}
