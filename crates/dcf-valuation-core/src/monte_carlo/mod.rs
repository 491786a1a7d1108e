pub mod simulation;

pub use simulation::{
    simulate, trial_seed, HistogramBin, McPercentiles, SimulationInput, SimulationOutput, TrialDraw,
};
