use super::types::{Inputs, SimulationResult};

pub fn validate_inputs(inputs: &Inputs) -> Result<(), String> {
    if inputs.end_age <= inputs.current_age {
        return Err("end_age must be > current_age".to_string());
    }
    if inputs.months_per_year == 0 {
        return Err("months_per_year must be > 0".to_string());
    }

    for (name, value) in [
        ("initial_wealth", inputs.initial_wealth),
        ("initial_monthly_income", inputs.initial_monthly_income),
        (
            "retirement_monthly_income",
            inputs.retirement_monthly_income,
        ),
        ("utility_exponent_pre", inputs.utility_exponent_pre),
        ("utility_exponent_post", inputs.utility_exponent_post),
        ("utility_multiplier_pre", inputs.utility_multiplier_pre),
        ("utility_multiplier_post", inputs.utility_multiplier_post),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be finite"));
        }
    }

    for (name, rate) in [
        ("income_growth_rate", inputs.income_growth_rate),
        ("investment_growth_rate", inputs.investment_growth_rate),
    ] {
        if !rate.is_finite() || rate <= -1.0 {
            return Err(format!("{name} must be a finite annual rate > -100%"));
        }
    }

    Ok(())
}

/// Advances wealth and enjoyment one simulated month at a time from
/// `current_age` to `end_age`. Callers must pass a `retirement_age` within
/// `[current_age, end_age]` and validated inputs; the recurrence itself never
/// fails for in-domain values.
pub fn simulate(inputs: &Inputs, retirement_age: u32, monthly_spending: f64) -> SimulationResult {
    let months_per_year = f64::from(inputs.months_per_year);
    let months = u64::from(inputs.end_age - inputs.current_age) * u64::from(inputs.months_per_year);
    let horizon_years = f64::from(inputs.end_age - inputs.current_age);
    let current_age = f64::from(inputs.current_age);
    let retirement_age_years = f64::from(retirement_age);

    let investment_factor = (1.0 + inputs.investment_growth_rate).powf(1.0 / months_per_year);
    let income_factor = (1.0 + inputs.income_growth_rate).powf(1.0 / months_per_year);

    let mut wealth = inputs.initial_wealth;
    let mut working_income = inputs.initial_monthly_income;
    let mut total_enjoyment = 0.0;
    let mut is_feasible = true;

    for month in 0..months {
        let age = current_age + month as f64 / months_per_year;
        let retired = age >= retirement_age_years;

        let income = if retired {
            inputs.retirement_monthly_income
        } else {
            working_income
        };

        // Growth applies to the opening balance; the month's net cash flow
        // lands at month end.
        wealth = wealth * investment_factor + (income - monthly_spending);
        if wealth < 0.0 {
            // Latched: the trajectory keeps evolving so final_wealth stays
            // reportable, but feasibility never recovers.
            is_feasible = false;
        }

        let (multiplier, exponent) = if retired {
            (
                inputs.utility_multiplier_post,
                inputs.utility_exponent_post,
            )
        } else {
            (inputs.utility_multiplier_pre, inputs.utility_exponent_pre)
        };
        let age_factor = (1.0 - (age - current_age) / horizon_years).max(0.0);
        total_enjoyment += multiplier * age_factor * spending_utility(monthly_spending, exponent);

        if !retired {
            working_income *= income_factor;
        }
    }

    SimulationResult {
        retirement_age,
        monthly_spending,
        is_feasible,
        total_enjoyment,
        final_wealth: wealth,
    }
}

// Exponent zero selects log utility; non-positive spending contributes
// nothing rather than feeding ln or a fractional power.
fn spending_utility(spending: f64, exponent: f64) -> f64 {
    if spending <= 0.0 {
        return 0.0;
    }
    if exponent == 0.0 {
        spending.ln()
    } else {
        spending.powf(exponent)
    }
}
