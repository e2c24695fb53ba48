use super::engine::{simulate, validate_inputs};
use super::types::{AgeResult, Inputs, SimulationResult, SpendingGrid, SweepResult};

/// Locates the highest grid spending level that keeps wealth non-negative
/// through `end_age`, for one fixed retirement age.
pub fn find_max_feasible_spending(
    inputs: &Inputs,
    retirement_age: u32,
    grid: &SpendingGrid,
) -> Result<AgeResult, String> {
    validate_inputs(inputs)?;
    validate_grid(grid)?;
    validate_retirement_age(inputs, retirement_age)?;
    Ok(search_grid(inputs, retirement_age, grid))
}

/// Runs the spending search independently for every retirement age in the
/// inclusive range, ascending. `best_index` points at the attainable record
/// with the highest total enjoyment.
pub fn run_sweep(
    inputs: &Inputs,
    min_retirement_age: u32,
    max_retirement_age: u32,
    grid: &SpendingGrid,
) -> Result<SweepResult, String> {
    validate_inputs(inputs)?;
    validate_grid(grid)?;
    if min_retirement_age > max_retirement_age {
        return Err(format!(
            "min_retirement_age {min_retirement_age} must be <= max_retirement_age {max_retirement_age}"
        ));
    }
    validate_retirement_age(inputs, min_retirement_age)?;
    validate_retirement_age(inputs, max_retirement_age)?;

    let age_results: Vec<AgeResult> = (min_retirement_age..=max_retirement_age)
        .map(|age| search_grid(inputs, age, grid))
        .collect();

    let best_index = age_results
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| record.total_enjoyment.map(|enjoyment| (idx, enjoyment)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx);

    Ok(SweepResult {
        age_results,
        best_index,
    })
}

fn validate_grid(grid: &SpendingGrid) -> Result<(), String> {
    if !grid.min.is_finite() || grid.min < 0.0 {
        return Err("spending grid min must be >= 0".to_string());
    }
    if !grid.max.is_finite() || grid.max < grid.min {
        return Err("spending grid max must be >= min".to_string());
    }
    if !grid.step.is_finite() || grid.step <= 0.0 {
        return Err("spending grid step must be > 0".to_string());
    }
    Ok(())
}

fn validate_retirement_age(inputs: &Inputs, retirement_age: u32) -> Result<(), String> {
    if retirement_age < inputs.current_age || retirement_age > inputs.end_age {
        return Err(format!(
            "retirement_age {retirement_age} must be within [current_age, end_age] = [{}, {}]",
            inputs.current_age, inputs.end_age
        ));
    }
    Ok(())
}

// Feasibility is monotone non-increasing in spending, so the boundary between
// the feasible prefix and infeasible suffix of the grid can be bisected.
fn search_grid(inputs: &Inputs, retirement_age: u32, grid: &SpendingGrid) -> AgeResult {
    let points = grid.point_count();

    let lowest = simulate(inputs, retirement_age, grid.spending_at(0));
    if !lowest.is_feasible {
        // Even the cheapest grid point ruins the plan. Outputs stay unset so
        // an unattainable age remains distinct from a sustainable zero budget.
        return AgeResult {
            retirement_age,
            best_monthly_spending: None,
            total_enjoyment: None,
            final_wealth: None,
        };
    }

    let highest = simulate(inputs, retirement_age, grid.spending_at(points - 1));
    if highest.is_feasible {
        return record_for(retirement_age, &highest);
    }

    let mut lo = 0usize;
    let mut hi = points - 1;
    let mut best = lowest;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        let candidate = simulate(inputs, retirement_age, grid.spending_at(mid));
        if candidate.is_feasible {
            lo = mid;
            best = candidate;
        } else {
            hi = mid;
        }
    }

    record_for(retirement_age, &best)
}

fn record_for(retirement_age: u32, result: &SimulationResult) -> AgeResult {
    AgeResult {
        retirement_age,
        best_monthly_spending: Some(result.monthly_spending),
        total_enjoyment: Some(result.total_enjoyment),
        final_wealth: Some(result.final_wealth),
    }
}
