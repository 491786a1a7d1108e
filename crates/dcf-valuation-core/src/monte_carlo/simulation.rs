use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;
use tracing::debug;

use crate::error::DcfError;
use crate::types::{decimal_to_f64, ComputationMetadata, ComputationOutput, Money, Rate};
use crate::valuation::{AssumptionSet, DEFAULT_HORIZON_PERIODS};
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Helper: build ComputationOutput without requiring Decimal
// ---------------------------------------------------------------------------

fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a Monte Carlo DCF over revenue growth and EBIT margin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    /// Trailing annual revenue the forecast compounds from
    pub base_revenue: Money,
    /// Baseline assumptions; growth and margin are the means of the draws
    #[serde(default)]
    pub assumptions: AssumptionSet,
    /// Standard deviation of the revenue growth draw
    pub growth_std_dev: Rate,
    /// Standard deviation of the EBIT margin draw
    pub margin_std_dev: Rate,
    /// Number of trials
    #[serde(default = "default_trials")]
    pub trials: u32,
    /// Explicit forecast years per trial
    #[serde(default = "default_horizon")]
    pub horizon_periods: u32,
    /// Master seed; drawn from entropy and reported back when absent
    pub seed: Option<u64>,
}

fn default_trials() -> u32 {
    10_000
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_PERIODS
}

/// The randomised pair used by one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialDraw {
    pub growth_rate: f64,
    pub ebit_margin: f64,
}

/// Percentile summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// A single histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Output of a Monte Carlo DCF simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// Master seed the per-trial seeds were derived from
    pub seed: u64,
    pub trials: u32,
    /// Enterprise value per trial, in trial order
    pub enterprise_values: Vec<f64>,
    /// Growth / margin pair per trial, in trial order
    pub draws: Vec<TrialDraw>,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: McPercentiles,
    pub histogram: Vec<HistogramBin>,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// A normal perturbation around a mean; zero spread always yields the mean.
#[derive(Debug, Clone)]
enum Perturbation {
    Fixed(f64),
    Normal(Normal),
}

impl Perturbation {
    fn new(field: &str, mean: f64, std_dev: f64) -> DcfResult<Self> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(DcfError::InvalidInput {
                field: field.into(),
                reason: format!("Standard deviation must be finite and non-negative, got {std_dev}"),
            });
        }
        if std_dev == 0.0 {
            return Ok(Perturbation::Fixed(mean));
        }
        let n = Normal::new(mean, std_dev).map_err(|e| DcfError::InvalidInput {
            field: field.into(),
            reason: format!("Invalid Normal parameters: {e}"),
        })?;
        Ok(Perturbation::Normal(n))
    }

    fn draw(&self, rng: &mut StdRng) -> f64 {
        match self {
            Perturbation::Fixed(v) => *v,
            Perturbation::Normal(n) => rng.sample(n),
        }
    }
}

/// Per-trial seed from the master seed and trial index (SplitMix64 finaliser).
///
/// Trials own independent generators, so results do not depend on which
/// worker thread runs them.
pub fn trial_seed(master_seed: u64, index: u64) -> u64 {
    let mut z = master_seed.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ---------------------------------------------------------------------------
// Per-trial valuation
// ---------------------------------------------------------------------------

/// Baseline figures shared by every trial, as f64.
#[derive(Debug, Clone, Copy)]
struct TrialParams {
    base_revenue: f64,
    tax_rate: f64,
    capex_pct: f64,
    depreciation_pct: f64,
    nwc_change_pct: f64,
    discount_rate: f64,
    terminal_growth_rate: f64,
    horizon: u32,
}

impl TrialParams {
    fn from_input(input: &SimulationInput) -> DcfResult<Self> {
        let a = &input.assumptions;
        Ok(TrialParams {
            base_revenue: decimal_to_f64("base_revenue", input.base_revenue)?,
            tax_rate: decimal_to_f64("tax_rate", a.tax_rate)?,
            capex_pct: decimal_to_f64("capex_pct", a.capex_pct)?,
            depreciation_pct: decimal_to_f64("depreciation_pct", a.depreciation_pct)?,
            nwc_change_pct: decimal_to_f64("nwc_change_pct", a.nwc_change_pct)?,
            discount_rate: decimal_to_f64("discount_rate", a.discount_rate)?,
            terminal_growth_rate: decimal_to_f64("terminal_growth_rate", a.terminal_growth_rate)?,
            horizon: input.horizon_periods,
        })
    }
}

/// Enterprise value for one growth / margin pair.
///
/// Tax is applied as `margin * (1 - tax)` on revenue directly, not through an
/// explicit EBIT -> NOPAT step.
fn trial_enterprise_value(p: &TrialParams, growth: f64, margin: f64) -> f64 {
    let mut npv = 0.0_f64;
    let mut last_fcf = 0.0_f64;

    for t in 1..=p.horizon {
        let revenue = p.base_revenue * (1.0 + growth).powi(t as i32);
        let fcf = revenue * margin * (1.0 - p.tax_rate) + revenue * p.depreciation_pct
            - revenue * p.capex_pct
            - revenue * p.nwc_change_pct;
        npv += fcf / (1.0 + p.discount_rate).powi(t as i32);
        last_fcf = fcf;
    }

    let terminal_value =
        last_fcf * (1.0 + p.terminal_growth_rate) / (p.discount_rate - p.terminal_growth_rate);
    npv + terminal_value / (1.0 + p.discount_rate).powi(p.horizon as i32)
}

fn run_trial(
    params: &TrialParams,
    growth: &Perturbation,
    margin: &Perturbation,
    seed: u64,
) -> (TrialDraw, f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let draw = TrialDraw {
        growth_rate: growth.draw(&mut rng),
        ebit_margin: margin.draw(&mut rng),
    };
    let ev = trial_enterprise_value(params, draw.growth_rate, draw.ebit_margin);
    (draw, ev)
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Compute the percentile value from a **sorted**, non-empty slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Build a histogram with `num_bins` equal-width bins.
fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let min_val = sorted[0];
    let max_val = sorted[sorted.len() - 1];

    // Handle case where all values are the same
    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| {
            let lower = min_val + i as f64 * bin_width;
            let upper = if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            };
            HistogramBin {
                lower,
                upper,
                count: 0,
                frequency: 0.0,
            }
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }

    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }

    bins
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

fn validate_input(input: &SimulationInput) -> DcfResult<()> {
    if input.trials == 0 {
        return Err(DcfError::InvalidInput {
            field: "trials".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if input.horizon_periods == 0 {
        return Err(DcfError::InvalidInput {
            field: "horizon_periods".into(),
            reason: "Must be at least 1".into(),
        });
    }
    let a = &input.assumptions;
    if a.discount_rate <= a.terminal_growth_rate {
        return Err(DcfError::DivergentTerminalValue {
            discount_rate: a.discount_rate,
            terminal_growth_rate: a.terminal_growth_rate,
        });
    }
    if a.discount_rate <= -Decimal::ONE {
        return Err(DcfError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Ok(())
}

/// Run a Monte Carlo DCF valuation.
///
/// Each trial draws growth and then margin from normals centred on the
/// baseline assumptions, projects free cash flow, discounts it at the baseline
/// discount rate and adds a Gordon terminal value at the baseline terminal
/// growth. Trials run in parallel; the output keeps trial order and is
/// bit-for-bit reproducible for a given seed.
pub fn simulate(input: &SimulationInput) -> DcfResult<ComputationOutput<SimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let params = TrialParams::from_input(input)?;
    let growth = Perturbation::new(
        "growth_std_dev",
        decimal_to_f64("growth_rate", input.assumptions.growth_rate)?,
        decimal_to_f64("growth_std_dev", input.growth_std_dev)?,
    )?;
    let margin = Perturbation::new(
        "margin_std_dev",
        decimal_to_f64("ebit_margin", input.assumptions.ebit_margin)?,
        decimal_to_f64("margin_std_dev", input.margin_std_dev)?,
    )?;

    let seed = input
        .seed
        .unwrap_or_else(|| StdRng::from_entropy().gen::<u64>());
    if input.seed.is_none() {
        warnings.push(format!("No seed supplied; generated seed {seed} for replay"));
    }

    debug!(seed, trials = input.trials, horizon = params.horizon, "running monte carlo dcf");

    let outcomes: Vec<(TrialDraw, f64)> = (0..input.trials)
        .into_par_iter()
        .map(|i| run_trial(&params, &growth, &margin, trial_seed(seed, u64::from(i))))
        .collect();

    if let Some(idx) = outcomes.iter().position(|(_, ev)| !ev.is_finite()) {
        return Err(DcfError::InvalidInput {
            field: "trials".into(),
            reason: format!("Trial {idx} produced a non-finite enterprise value"),
        });
    }

    let (draws, enterprise_values): (Vec<TrialDraw>, Vec<f64>) = outcomes.into_iter().unzip();

    let negative = enterprise_values.iter().filter(|ev| **ev < 0.0).count();
    if negative > 0 {
        warnings.push(format!(
            "{negative} of {} trials produced a negative enterprise value",
            input.trials
        ));
    }

    let mut sorted = enterprise_values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len() as f64;
    let mean = enterprise_values.iter().sum::<f64>() / n;
    let variance = enterprise_values
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / n;

    let percentiles = McPercentiles {
        p5: percentile_sorted(&sorted, 5.0),
        p10: percentile_sorted(&sorted, 10.0),
        p25: percentile_sorted(&sorted, 25.0),
        p50: percentile_sorted(&sorted, 50.0),
        p75: percentile_sorted(&sorted, 75.0),
        p90: percentile_sorted(&sorted, 90.0),
        p95: percentile_sorted(&sorted, 95.0),
    };

    let output = SimulationOutput {
        seed,
        trials: input.trials,
        median: percentiles.p50,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        histogram: build_histogram(&sorted, 20),
        percentiles,
        mean,
        std_dev: variance.sqrt(),
        enterprise_values,
        draws,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo DCF (normal growth and EBIT margin draws)",
        &serde_json::json!({
            "base_revenue": input.base_revenue,
            "assumptions": input.assumptions,
            "growth_std_dev": input.growth_std_dev,
            "margin_std_dev": input.margin_std_dev,
            "trials": input.trials,
            "horizon_periods": input.horizon_periods,
            "seed": seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    const SEED: u64 = 42;

    fn basic_input() -> SimulationInput {
        SimulationInput {
            base_revenue: dec!(100),
            assumptions: AssumptionSet::default(),
            growth_std_dev: dec!(0.02),
            margin_std_dev: dec!(0.03),
            trials: 1_000,
            horizon_periods: 5,
            seed: Some(SEED),
        }
    }

    #[test]
    fn test_simulation_runs() {
        let out = simulate(&basic_input()).unwrap().result;
        assert_eq!(out.enterprise_values.len(), 1_000);
        assert_eq!(out.draws.len(), 1_000);
        assert!(out.mean > 0.0);
        assert!(out.std_dev > 0.0);
    }

    #[test]
    fn test_seeded_reproducibility() {
        let r1 = simulate(&basic_input()).unwrap().result;
        let r2 = simulate(&basic_input()).unwrap().result;
        assert_eq!(r1.enterprise_values, r2.enterprise_values);
        assert_eq!(r1.draws, r2.draws);
        assert_eq!(r1.mean, r2.mean);
    }

    #[test]
    fn test_different_seeds_differ() {
        let r1 = simulate(&basic_input()).unwrap().result;
        let mut input = basic_input();
        input.seed = Some(SEED + 1);
        let r2 = simulate(&input).unwrap().result;
        assert_ne!(r1.enterprise_values, r2.enterprise_values);
    }

    #[test]
    fn test_trial_order_is_prefix_stable() {
        let mut short = basic_input();
        short.trials = 10;
        let short = simulate(&short).unwrap().result;
        let long = simulate(&basic_input()).unwrap().result;
        assert_eq!(short.enterprise_values[..], long.enterprise_values[..10]);
    }

    #[test]
    fn test_zero_spread_matches_deterministic_formula() {
        let mut input = basic_input();
        input.growth_std_dev = Decimal::ZERO;
        input.margin_std_dev = Decimal::ZERO;
        input.trials = 3;
        let out = simulate(&input).unwrap().result;
        for ev in &out.enterprise_values {
            assert_relative_eq!(*ev, 348.170_309_531_247_8, max_relative = 1e-9);
        }
        assert_eq!(out.histogram.len(), 1);
    }

    #[test]
    fn test_draws_centre_on_assumptions() {
        let mut input = basic_input();
        input.trials = 20_000;
        let out = simulate(&input).unwrap().result;
        let n = out.draws.len() as f64;
        let g_mean = out.draws.iter().map(|d| d.growth_rate).sum::<f64>() / n;
        let m_mean = out.draws.iter().map(|d| d.ebit_margin).sum::<f64>() / n;
        assert!((g_mean - 0.05).abs() < 0.001, "growth mean={g_mean}");
        assert!((m_mean - 0.25).abs() < 0.002, "margin mean={m_mean}");
    }

    #[test]
    fn test_percentile_ordering() {
        let p = simulate(&basic_input()).unwrap().result.percentiles;
        assert!(p.p5 <= p.p10);
        assert!(p.p10 <= p.p25);
        assert!(p.p25 <= p.p50);
        assert!(p.p50 <= p.p75);
        assert!(p.p75 <= p.p90);
        assert!(p.p90 <= p.p95);
    }

    #[test]
    fn test_histogram_total_count() {
        let out = simulate(&basic_input()).unwrap().result;
        assert_eq!(out.histogram.len(), 20);
        let total: u32 = out.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 1_000);
        let freq: f64 = out.histogram.iter().map(|b| b.frequency).sum();
        assert!((freq - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_generated_seed_reported() {
        let mut input = basic_input();
        input.seed = None;
        input.trials = 50;
        let first = simulate(&input).unwrap();
        assert!(first.warnings.iter().any(|w| w.contains("generated seed")));

        input.seed = Some(first.result.seed);
        let replay = simulate(&input).unwrap().result;
        assert_eq!(first.result.enterprise_values, replay.enterprise_values);
    }

    #[test]
    fn test_zero_trials_rejected() {
        let mut input = basic_input();
        input.trials = 0;
        assert!(matches!(simulate(&input), Err(DcfError::InvalidInput { .. })));
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let mut input = basic_input();
        input.horizon_periods = 0;
        assert!(simulate(&input).is_err());
    }

    #[test]
    fn test_negative_std_dev_rejected() {
        let mut input = basic_input();
        input.margin_std_dev = dec!(-0.01);
        assert!(matches!(simulate(&input), Err(DcfError::InvalidInput { .. })));
    }

    #[test]
    fn test_divergent_terminal_rejected() {
        let mut input = basic_input();
        input.assumptions.terminal_growth_rate = input.assumptions.discount_rate;
        assert!(matches!(
            simulate(&input),
            Err(DcfError::DivergentTerminalValue { .. })
        ));
    }

    #[test]
    fn test_non_finite_trial_reports_index() {
        let mut input = basic_input();
        input.assumptions.growth_rate = dec!(10000000000);
        input.growth_std_dev = Decimal::ZERO;
        input.margin_std_dev = Decimal::ZERO;
        input.trials = 3;
        input.horizon_periods = 40;
        let err = simulate(&input).unwrap_err();
        assert!(matches!(
            err,
            DcfError::InvalidInput { ref field, ref reason }
                if field == "trials" && reason.starts_with("Trial 0 ")
        ));
    }

    #[test]
    fn test_results_independent_of_pool_size() {
        let run_in_pool = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| simulate(&basic_input()).unwrap().result)
        };
        let single = run_in_pool(1);
        let multi = run_in_pool(4);
        assert_eq!(single.enterprise_values, multi.enterprise_values);
        assert_eq!(single.draws, multi.draws);
        assert_eq!(single.percentiles, multi.percentiles);
    }

    #[test]
    fn test_trial_seed_spreads_indices() {
        assert_ne!(trial_seed(SEED, 0), trial_seed(SEED, 1));
        assert_ne!(trial_seed(SEED, 1), trial_seed(SEED + 1, 0));
        assert_eq!(trial_seed(7, 3), trial_seed(7, 3));
    }

    #[test]
    fn test_metadata_precision_field() {
        let result = simulate(&basic_input()).unwrap();
        assert_eq!(result.metadata.precision, "ieee754_f64");
    }
}
