use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Assumption ratios driving a single valuation run.
///
/// Every field is a fraction (0.05 = 5%). No range checks happen here; the
/// discounting engine enforces `discount_rate > terminal_growth_rate`.
/// Fields missing on deserialisation take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionSet {
    /// Constant annual revenue growth, compounded from the base revenue
    pub growth_rate: Rate,
    /// EBIT as a fraction of revenue
    pub ebit_margin: Rate,
    /// Tax rate applied to EBIT
    pub tax_rate: Rate,
    /// Capital expenditure as a fraction of revenue
    pub capex_pct: Rate,
    /// Depreciation as a fraction of revenue
    pub depreciation_pct: Rate,
    /// Change in net working capital as a fraction of revenue
    pub nwc_change_pct: Rate,
    /// Discount rate applied to forecast cash flows and the terminal value
    pub discount_rate: Rate,
    /// Perpetuity growth rate for the Gordon terminal value
    pub terminal_growth_rate: Rate,
}

impl Default for AssumptionSet {
    fn default() -> Self {
        AssumptionSet {
            growth_rate: dec!(0.05),
            ebit_margin: dec!(0.25),
            tax_rate: dec!(0.21),
            capex_pct: dec!(0.06),
            depreciation_pct: dec!(0.05),
            nwc_change_pct: dec!(0.02),
            discount_rate: dec!(0.08),
            terminal_growth_rate: dec!(0.025),
        }
    }
}

impl AssumptionSet {
    /// Spread between the discount rate and the terminal growth rate.
    pub fn terminal_spread(&self) -> Decimal {
        self.discount_rate - self.terminal_growth_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spread_is_positive() {
        let a = AssumptionSet::default();
        assert_eq!(a.terminal_spread(), dec!(0.055));
    }

    #[test]
    fn test_deserialize_from_numbers() {
        let json = serde_json::json!({
            "growth_rate": 0.07,
            "ebit_margin": 0.3,
            "tax_rate": 0.21,
            "capex_pct": 0.05,
            "depreciation_pct": 0.04,
            "nwc_change_pct": 0.01,
            "discount_rate": 0.09,
            "terminal_growth_rate": 0.02
        });
        let a: AssumptionSet = serde_json::from_value(json).unwrap();
        assert_eq!(a.growth_rate, dec!(0.07));
        assert_eq!(a.discount_rate, dec!(0.09));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let a: AssumptionSet =
            serde_json::from_value(serde_json::json!({ "ebit_margin": "0.30" })).unwrap();
        assert_eq!(a.ebit_margin, dec!(0.30));
        assert_eq!(a.growth_rate, dec!(0.05));
        assert_eq!(a.terminal_growth_rate, dec!(0.025));
    }
}
