mod engine;
mod solver;
mod types;

pub use engine::{simulate, validate_inputs};
pub use solver::{find_max_feasible_spending, run_sweep};
pub use types::{AgeResult, Inputs, SimulationResult, SpendingGrid, SweepResult};
