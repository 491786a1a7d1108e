use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DcfError;
use crate::time_value::{checked_sum, discount_flows, discount_to_present, gordon_terminal_value};
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::forecast::Projection;

/// Discounted view of a projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountOutput {
    /// `1 / (1 + r)^i` for each forecast period
    pub discount_factors: Vec<Rate>,
    /// Free cash flow times its discount factor, per period
    pub discounted_cash_flows: Vec<Money>,
    /// Sum of the discounted explicit-period cash flows
    pub pv_of_fcf: Money,
    /// Gordon growth terminal value at the end of the horizon
    pub terminal_value: Money,
    /// Terminal value discounted back over the full horizon
    pub pv_of_terminal: Money,
    /// PV(explicit flows) + PV(terminal value)
    pub enterprise_value: Money,
}

/// Discount a projection and attach a Gordon growth terminal value.
///
/// Fails with [`DcfError::DivergentTerminalValue`] when
/// `discount_rate <= terminal_growth_rate` or when the spread is too narrow
/// for the terminal value to fit the decimal range.
pub fn discount(
    projection: &Projection,
    discount_rate: Rate,
    terminal_growth_rate: Rate,
) -> DcfResult<DiscountOutput> {
    let final_year = projection.final_year().ok_or_else(|| {
        DcfError::InsufficientData("Projection contains no forecast years".into())
    })?;

    let terminal_value =
        gordon_terminal_value(final_year.free_cash_flow, discount_rate, terminal_growth_rate)?;

    let (discount_factors, discounted_cash_flows) =
        discount_flows(discount_rate, &projection.free_cash_flows())?;
    let pv_of_fcf = checked_sum(&discounted_cash_flows)?;

    let pv_of_terminal = discount_to_present(terminal_value, discount_rate, projection.horizon())?;
    let enterprise_value = pv_of_fcf
        .checked_add(pv_of_terminal)
        .ok_or_else(|| DcfError::InvalidInput {
            field: "enterprise_value".into(),
            reason: "PV of flows plus PV of terminal value overflows decimal range".into(),
        })?;

    debug!(
        discount_rate = %discount_rate,
        terminal_growth_rate = %terminal_growth_rate,
        enterprise_value = %enterprise_value,
        "discounted projection"
    );

    Ok(DiscountOutput {
        discount_factors,
        discounted_cash_flows,
        pv_of_fcf,
        terminal_value,
        pv_of_terminal,
        enterprise_value,
    })
}
