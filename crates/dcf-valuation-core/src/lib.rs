pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "valuation")]
pub mod financials;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "export")]
pub mod export;

pub use error::DcfError;
pub use types::*;

/// Standard result type for all valuation operations
pub type DcfResult<T> = Result<T, DcfError>;
