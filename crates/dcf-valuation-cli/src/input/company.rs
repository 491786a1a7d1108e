use clap::Args;
use rust_decimal::Decimal;
use std::collections::HashMap;

use dcf_valuation_core::financials::{FinancialSnapshot, FinancialsProvider, StaticFinancialsProvider};
use dcf_valuation_core::valuation::{AssumptionSet, DcfInput, DEFAULT_HORIZON_PERIODS};

use super::file;

/// Where the company figures come from: a financials file plus ticker, or
/// flags in millions.
#[derive(Args, Debug, Clone, Default)]
pub struct CompanyArgs {
    /// JSON or YAML map of ticker -> financial snapshot (raw currency units)
    #[arg(long, requires = "ticker")]
    pub financials: Option<String>,

    /// Ticker to look up in the financials file
    #[arg(long)]
    pub ticker: Option<String>,

    /// Trailing annual revenue, in millions
    #[arg(long)]
    pub base_revenue: Option<Decimal>,

    /// Cash and equivalents, in millions
    #[arg(long)]
    pub cash: Option<Decimal>,

    /// Long-term debt, in millions
    #[arg(long)]
    pub debt: Option<Decimal>,

    /// Shares outstanding, in millions
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Explicit forecast years
    #[arg(long)]
    pub years: Option<u32>,

    /// Calendar year of the first forecast period
    #[arg(long)]
    pub first_year: Option<i32>,
}

/// DCF inputs plus the snapshot they came from, if any.
pub struct ResolvedCompany {
    pub input: DcfInput,
    pub snapshot: Option<FinancialSnapshot>,
}

impl CompanyArgs {
    pub fn horizon(&self) -> u32 {
        self.years.unwrap_or(DEFAULT_HORIZON_PERIODS)
    }

    pub fn resolve(
        &self,
        assumptions: AssumptionSet,
    ) -> Result<ResolvedCompany, Box<dyn std::error::Error>> {
        let (mut input, snapshot) = match (&self.financials, &self.ticker) {
            (Some(path), Some(ticker)) => {
                let snapshot = load_provider(path)?.fetch_financials(ticker)?;
                let input = DcfInput::from_financials(&snapshot, assumptions, self.horizon())?;
                (input, Some(snapshot))
            }
            _ => {
                let base_revenue = self
                    .base_revenue
                    .ok_or("--base-revenue is required (or provide --financials and --ticker)")?;
                let mut input = DcfInput::new(base_revenue, assumptions);
                input.horizon_periods = Some(self.horizon());
                (input, None)
            }
        };

        // Flags override whatever the snapshot supplied
        if let Some(rev) = self.base_revenue {
            input.base_revenue = rev;
        }
        if self.cash.is_some() {
            input.cash = self.cash;
        }
        if self.debt.is_some() {
            input.debt = self.debt;
        }
        if self.shares.is_some() {
            input.shares_outstanding = self.shares;
        }
        if self.first_year.is_some() {
            input.first_forecast_year = self.first_year;
        }

        Ok(ResolvedCompany { input, snapshot })
    }
}

fn load_provider(path: &str) -> Result<StaticFinancialsProvider, Box<dyn std::error::Error>> {
    let snapshots: HashMap<String, FinancialSnapshot> = file::read_structured(path)?;
    let provider = StaticFinancialsProvider::new(snapshots.into_values());
    tracing::debug!(path, companies = provider.len(), "loaded financials");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn financials_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            f,
            r#"{{
                "ACME": {{
                    "ticker": "ACME",
                    "company_name": "Acme Corp",
                    "latest_annual_revenue": 2500000000.0,
                    "cash_balance": 300000000.0,
                    "long_term_debt": 800000000.0,
                    "shares_outstanding": 100000000.0,
                    "fiscal_year_end": "2023-12-31"
                }}
            }}"#
        )
        .unwrap();
        f
    }

    #[test]
    fn test_flags_only() {
        let args = CompanyArgs {
            base_revenue: Some(dec!(100)),
            shares: Some(dec!(10)),
            ..CompanyArgs::default()
        };
        let resolved = args.resolve(AssumptionSet::default()).unwrap();
        assert_eq!(resolved.input.base_revenue, dec!(100));
        assert_eq!(resolved.input.horizon(), 5);
        assert!(resolved.snapshot.is_none());
    }

    #[test]
    fn test_missing_revenue_is_error() {
        let err = CompanyArgs::default()
            .resolve(AssumptionSet::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("--base-revenue"));
    }

    #[test]
    fn test_financials_file_lookup() {
        let f = financials_file();
        let args = CompanyArgs {
            financials: Some(f.path().to_str().unwrap().to_string()),
            ticker: Some("acme".into()),
            cash: Some(dec!(0)),
            ..CompanyArgs::default()
        };
        let resolved = args.resolve(AssumptionSet::default()).unwrap();
        assert_eq!(resolved.input.base_revenue, dec!(2500));
        assert_eq!(resolved.input.debt, Some(dec!(800)));
        assert_eq!(resolved.input.cash, Some(dec!(0)));
        assert_eq!(resolved.input.first_forecast_year, Some(2024));
        assert!(resolved.snapshot.is_some());
    }

    #[test]
    fn test_unknown_ticker() {
        let f = financials_file();
        let args = CompanyArgs {
            financials: Some(f.path().to_str().unwrap().to_string()),
            ticker: Some("NOPE".into()),
            ..CompanyArgs::default()
        };
        let err = args.resolve(AssumptionSet::default()).err().unwrap();
        assert!(err.to_string().contains("NOPE"));
    }
}
