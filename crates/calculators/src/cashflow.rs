use common::{invalid_input, CalculationError, FinanceResult};
use tracing::debug;

const IRR_TOLERANCE: f64 = 1e-10;
const IRR_MAX_ITERATIONS: usize = 200;
/// Search bracket for the bisection fallback, as fractions per period
const IRR_LOWER_BOUND: f64 = -0.9999;
const IRR_UPPER_BOUND: f64 = 10.0;

/// Valor presente de um valor futuro descontado por `years` anos
pub fn present_value(future_value: f64, annual_rate: f64, years: u32) -> f64 {
    future_value / (1.0 + annual_rate / 100.0).powi(years as i32)
}

pub fn future_value(present_value: f64, annual_rate: f64, years: u32) -> f64 {
    present_value * (1.0 + annual_rate / 100.0).powi(years as i32)
}

/// NPV with the first flow at t = 0 (undiscounted).
pub fn net_present_value(flows: &[f64], rate: f64) -> f64 {
    npv_fraction(flows, rate / 100.0)
}

fn npv_fraction(flows: &[f64], rate: f64) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(t, flow)| flow / (1.0 + rate).powi(t as i32))
        .sum()
}

fn npv_derivative(flows: &[f64], rate: f64) -> f64 {
    flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, flow)| -(t as f64) * flow / (1.0 + rate).powi(t as i32 + 1))
        .sum()
}

/// Taxa interna de retorno em percentual por período.
///
/// Newton iteration from 10%, falling back to bisection over
/// (-99.99%, 1000%) when Newton leaves the bracket or stalls.
pub fn internal_rate_of_return(flows: &[f64]) -> FinanceResult<f64> {
    if flows.len() < 2 {
        return Err(invalid_input("flows", "need at least two cash flows"));
    }
    let has_negative = flows.iter().any(|f| *f < 0.0);
    let has_positive = flows.iter().any(|f| *f > 0.0);
    if !has_negative || !has_positive {
        return Err(invalid_input(
            "flows",
            "need at least one negative and one positive cash flow",
        ));
    }

    if let Some(rate) = newton_irr(flows) {
        debug!(rate, method = "newton", "IRR converged");
        return Ok(rate * 100.0);
    }

    let rate = bisection_irr(flows)?;
    debug!(rate, method = "bisection", "IRR converged");
    Ok(rate * 100.0)
}

fn newton_irr(flows: &[f64]) -> Option<f64> {
    let mut rate = 0.1;
    for _ in 0..IRR_MAX_ITERATIONS {
        let value = npv_fraction(flows, rate);
        if value.abs() < IRR_TOLERANCE {
            return Some(rate);
        }
        let slope = npv_derivative(flows, rate);
        if slope == 0.0 || !slope.is_finite() {
            return None;
        }
        let next = rate - value / slope;
        if !next.is_finite() || next <= IRR_LOWER_BOUND || next >= IRR_UPPER_BOUND {
            return None;
        }
        if (next - rate).abs() < IRR_TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn bisection_irr(flows: &[f64]) -> FinanceResult<f64> {
    let mut low = IRR_LOWER_BOUND;
    let mut high = IRR_UPPER_BOUND;
    let mut f_low = npv_fraction(flows, low);
    let f_high = npv_fraction(flows, high);

    if f_low.signum() == f_high.signum() {
        return Err(CalculationError::NoConvergence(
            "NPV does not change sign between -99.99% and 1000%".to_string(),
        )
        .into());
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let f_mid = npv_fraction(flows, mid);
        if f_mid.abs() < IRR_TOLERANCE || (high - low) / 2.0 < IRR_TOLERANCE {
            return Ok(mid);
        }
        if f_mid.signum() == f_low.signum() {
            low = mid;
            f_low = f_mid;
        } else {
            high = mid;
        }
    }

    Err(CalculationError::NoConvergence(format!(
        "IRR bisection exceeded {IRR_MAX_ITERATIONS} iterations"
    ))
    .into())
}
