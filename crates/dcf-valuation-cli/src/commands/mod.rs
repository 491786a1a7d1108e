pub mod export;
pub mod monte_carlo;
pub mod scenarios;
pub mod valuation;
