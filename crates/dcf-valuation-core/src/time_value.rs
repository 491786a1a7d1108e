use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::DcfError;
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Compound growth factor `(1 + rate)^periods`.
pub fn compound_factor(rate: Rate, periods: u32) -> DcfResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powi(i64::from(periods))
        .ok_or_else(|| DcfError::InvalidInput {
            field: "rate".into(),
            reason: format!("(1 + {rate})^{periods} overflows decimal precision"),
        })
}

/// End-of-period discount factor `1 / (1 + rate)^period`.
pub fn discount_factor(rate: Rate, period: u32) -> DcfResult<Rate> {
    if rate <= dec!(-1) {
        return Err(DcfError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let compound = compound_factor(rate, period)?;
    if compound.is_zero() {
        return Err(DcfError::DivisionByZero {
            context: format!("discount factor at period {period}"),
        });
    }
    Ok(Decimal::ONE / compound)
}

/// Discount a sequence of year-end flows, the first flow landing at period 1.
///
/// Returns the per-period discount factors and discounted flows in input order.
pub fn discount_flows(rate: Rate, cash_flows: &[Money]) -> DcfResult<(Vec<Rate>, Vec<Money>)> {
    let mut factors = Vec::with_capacity(cash_flows.len());
    let mut discounted = Vec::with_capacity(cash_flows.len());

    for (idx, cf) in cash_flows.iter().enumerate() {
        let factor = discount_factor(rate, idx as u32 + 1)?;
        factors.push(factor);
        let pv = cf.checked_mul(factor).ok_or_else(|| DcfError::InvalidInput {
            field: "cash_flows".into(),
            reason: format!("Discounted flow at period {} overflows decimal range", idx + 1),
        })?;
        discounted.push(pv);
    }

    Ok((factors, discounted))
}

/// Net Present Value of year-end flows starting at period 1.
pub fn present_value(rate: Rate, cash_flows: &[Money]) -> DcfResult<Money> {
    let (_, discounted) = discount_flows(rate, cash_flows)?;
    checked_sum(&discounted)
}

/// Sum of amounts, failing instead of overflowing the decimal range.
pub fn checked_sum(amounts: &[Money]) -> DcfResult<Money> {
    amounts
        .iter()
        .try_fold(Decimal::ZERO, |acc, x| acc.checked_add(*x))
        .ok_or_else(|| DcfError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Sum of discounted flows overflows decimal range".into(),
        })
}

/// Gordon growth perpetuity: `cash_flow * (1 + g) / (r - g)`.
///
/// Requires `r > g`; anything else is reported as a divergent terminal value,
/// as is a spread so narrow that the perpetuity leaves the decimal range.
pub fn gordon_terminal_value(
    final_cash_flow: Money,
    discount_rate: Rate,
    terminal_growth_rate: Rate,
) -> DcfResult<Money> {
    if discount_rate <= terminal_growth_rate {
        return Err(DcfError::DivergentTerminalValue {
            discount_rate,
            terminal_growth_rate,
        });
    }
    final_cash_flow
        .checked_mul(Decimal::ONE + terminal_growth_rate)
        .and_then(|x| x.checked_div(discount_rate - terminal_growth_rate))
        .ok_or(DcfError::DivergentTerminalValue {
            discount_rate,
            terminal_growth_rate,
        })
}

/// Present value of an amount received at the end of `period`: `amount / (1 + rate)^period`.
pub fn discount_to_present(amount: Money, rate: Rate, period: u32) -> DcfResult<Money> {
    let compound = compound_factor(rate, period)?;
    if compound.is_zero() {
        return Err(DcfError::DivisionByZero {
            context: format!("present value at period {period}"),
        });
    }
    amount
        .checked_div(compound)
        .ok_or_else(|| DcfError::InvalidInput {
            field: "amount".into(),
            reason: format!("Present value at period {period} overflows decimal range"),
        })
}
