use clap::Args;
use rust_decimal::Decimal;

use dcf_valuation_core::valuation::AssumptionSet;

use super::file;

/// Assumption layering: defaults, then `--assumptions` file, then flags.
#[derive(Args, Debug, Clone, Default)]
pub struct AssumptionArgs {
    /// JSON or YAML file with assumption overrides (fractions, e.g. 0.05)
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Annual revenue growth rate
    #[arg(long, allow_negative_numbers = true)]
    pub growth_rate: Option<Decimal>,

    /// EBIT margin
    #[arg(long)]
    pub ebit_margin: Option<Decimal>,

    /// Tax rate on EBIT
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Capital expenditure as a fraction of revenue
    #[arg(long)]
    pub capex_pct: Option<Decimal>,

    /// Depreciation as a fraction of revenue
    #[arg(long)]
    pub depreciation_pct: Option<Decimal>,

    /// Change in net working capital as a fraction of revenue
    #[arg(long)]
    pub nwc_change_pct: Option<Decimal>,

    /// Discount rate
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Terminal (perpetuity) growth rate
    #[arg(long, alias = "terminal-growth", allow_negative_numbers = true)]
    pub terminal_growth_rate: Option<Decimal>,
}

impl AssumptionArgs {
    pub fn resolve(&self) -> Result<AssumptionSet, Box<dyn std::error::Error>> {
        let mut set = match self.assumptions {
            Some(ref path) => file::read_structured::<AssumptionSet>(path)?,
            None => AssumptionSet::default(),
        };

        let overrides = [
            (self.growth_rate, &mut set.growth_rate),
            (self.ebit_margin, &mut set.ebit_margin),
            (self.tax_rate, &mut set.tax_rate),
            (self.capex_pct, &mut set.capex_pct),
            (self.depreciation_pct, &mut set.depreciation_pct),
            (self.nwc_change_pct, &mut set.nwc_change_pct),
            (self.discount_rate, &mut set.discount_rate),
            (self.terminal_growth_rate, &mut set.terminal_growth_rate),
        ];
        for (flag, field) in overrides {
            if let Some(v) = flag {
                *field = v;
            }
        }

        Ok(set)
    }
}
