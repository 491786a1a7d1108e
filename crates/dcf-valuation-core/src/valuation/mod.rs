pub mod assumptions;
pub mod dcf;
pub mod discount;
pub mod equity;
pub mod forecast;

pub use assumptions::AssumptionSet;
pub use dcf::{calculate_dcf, DcfInput, ValuationOutput};
pub use discount::{discount, DiscountOutput};
pub use equity::{equity_value, price_per_share};
pub use forecast::{
    build_projection, project, project_calendar, ForecastYear, Projection, ProjectionInput,
    DEFAULT_HORIZON_PERIODS,
};
