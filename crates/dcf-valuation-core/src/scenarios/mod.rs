pub mod sensitivity;

pub use sensitivity::{
    grid_cell, sensitivity_grid, RateAxis, SensitivityGrid, SensitivityInput,
};
