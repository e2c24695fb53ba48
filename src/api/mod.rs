use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use crate::core::{AgeResult, Inputs, SpendingGrid, SweepResult, run_sweep};
use crate::report;

#[derive(Parser, Debug)]
#[command(
    name = "spendable",
    about = "Deterministic sustainable-spending estimator (max constant monthly spending per retirement age, scored by lifetime enjoyment)"
)]
struct Cli {
    #[arg(long, default_value_t = 30)]
    current_age: u32,
    #[arg(long, default_value_t = 90, help = "End-of-life age the plan must fund through")]
    end_age: u32,
    #[arg(long, default_value_t = 500_000.0)]
    initial_wealth: f64,
    #[arg(long, default_value_t = 8_000.0)]
    initial_monthly_income: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Annual real salary growth in percent, applied until retirement"
    )]
    income_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Fixed monthly income received after retirement"
    )]
    retirement_monthly_income: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Annual real investment return in percent"
    )]
    investment_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Spending utility exponent before retirement; 0 selects log utility"
    )]
    utility_exponent_pre: f64,
    #[arg(
        long,
        help = "Spending utility exponent after retirement; defaults to the pre-retirement exponent"
    )]
    utility_exponent_post: Option<f64>,
    #[arg(long, default_value_t = 1.0)]
    utility_multiplier_pre: f64,
    #[arg(
        long,
        default_value_t = 1.7,
        help = "Leisure multiplier applied to spending utility in retirement months"
    )]
    utility_multiplier_post: f64,
    #[arg(long, default_value_t = 12)]
    months_per_year: u32,
    #[arg(long, default_value_t = 34, help = "Lowest retirement age to test")]
    min_retirement_age: u32,
    #[arg(long, default_value_t = 45, help = "Highest retirement age to test")]
    max_retirement_age: u32,
    #[arg(long, default_value_t = 0.0, help = "Lowest monthly spending on the search grid")]
    spending_min: f64,
    #[arg(long, default_value_t = 30_000.0, help = "Highest monthly spending on the search grid")]
    spending_max: f64,
    #[arg(
        long,
        default_value_t = 100.0,
        help = "Spending grid step; the reported maximum is conservative to within one step"
    )]
    spending_step: f64,
    #[arg(long, help = "Also write the sweep to this path as CSV")]
    csv: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct SweepRequest {
    inputs: Inputs,
    min_retirement_age: u32,
    max_retirement_age: u32,
    grid: SpendingGrid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SweepPayload {
    current_age: Option<u32>,
    end_age: Option<u32>,
    initial_wealth: Option<f64>,
    initial_monthly_income: Option<f64>,
    income_growth_rate: Option<f64>,
    retirement_monthly_income: Option<f64>,
    investment_growth_rate: Option<f64>,
    utility_exponent_pre: Option<f64>,
    utility_exponent_post: Option<f64>,
    utility_multiplier_pre: Option<f64>,
    utility_multiplier_post: Option<f64>,
    months_per_year: Option<u32>,
    min_retirement_age: Option<u32>,
    max_retirement_age: Option<u32>,
    spending_min: Option<f64>,
    spending_max: Option<f64>,
    spending_step: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepResponse {
    min_retirement_age: u32,
    max_retirement_age: u32,
    spending_min: f64,
    spending_max: f64,
    spending_step: f64,
    best_retirement_age: Option<u32>,
    age_results: Vec<AgeResult>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: &Cli) -> Result<SweepRequest, String> {
    if cli.end_age <= cli.current_age {
        return Err("--end-age must be > --current-age".to_string());
    }

    if cli.months_per_year == 0 {
        return Err("--months-per-year must be > 0".to_string());
    }

    for (name, value) in [
        ("--initial-wealth", cli.initial_wealth),
        ("--initial-monthly-income", cli.initial_monthly_income),
        (
            "--retirement-monthly-income",
            cli.retirement_monthly_income,
        ),
        ("--utility-exponent-pre", cli.utility_exponent_pre),
        ("--utility-multiplier-pre", cli.utility_multiplier_pre),
        ("--utility-multiplier-post", cli.utility_multiplier_post),
    ] {
        if !value.is_finite() {
            return Err(format!("{name} must be finite"));
        }
    }

    if let Some(exponent) = cli.utility_exponent_post {
        if !exponent.is_finite() {
            return Err("--utility-exponent-post must be finite".to_string());
        }
    }

    for (name, rate) in [
        ("--income-growth-rate", cli.income_growth_rate),
        ("--investment-growth-rate", cli.investment_growth_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be a percentage > -100"));
        }
    }

    if cli.min_retirement_age > cli.max_retirement_age {
        return Err(
            "--min-retirement-age cannot exceed --max-retirement-age".to_string(),
        );
    }

    if cli.min_retirement_age < cli.current_age {
        return Err("--min-retirement-age must be >= --current-age".to_string());
    }

    if cli.max_retirement_age > cli.end_age {
        return Err("--max-retirement-age must be <= --end-age".to_string());
    }

    if !cli.spending_min.is_finite() || cli.spending_min < 0.0 {
        return Err("--spending-min must be >= 0".to_string());
    }

    if !cli.spending_max.is_finite() || cli.spending_max < cli.spending_min {
        return Err("--spending-max must be >= --spending-min".to_string());
    }

    if !cli.spending_step.is_finite() || cli.spending_step <= 0.0 {
        return Err("--spending-step must be > 0".to_string());
    }

    Ok(SweepRequest {
        inputs: Inputs {
            current_age: cli.current_age,
            end_age: cli.end_age,
            initial_wealth: cli.initial_wealth,
            initial_monthly_income: cli.initial_monthly_income,
            income_growth_rate: cli.income_growth_rate / 100.0,
            retirement_monthly_income: cli.retirement_monthly_income,
            investment_growth_rate: cli.investment_growth_rate / 100.0,
            utility_exponent_pre: cli.utility_exponent_pre,
            // Resolved once here; the engine never sees the optional form.
            utility_exponent_post: cli
                .utility_exponent_post
                .unwrap_or(cli.utility_exponent_pre),
            utility_multiplier_pre: cli.utility_multiplier_pre,
            utility_multiplier_post: cli.utility_multiplier_post,
            months_per_year: cli.months_per_year,
        },
        min_retirement_age: cli.min_retirement_age,
        max_retirement_age: cli.max_retirement_age,
        grid: SpendingGrid {
            min: cli.spending_min,
            max: cli.spending_max,
            step: cli.spending_step,
        },
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 30,
        end_age: 90,
        initial_wealth: 500_000.0,
        initial_monthly_income: 8_000.0,
        income_growth_rate: 1.0,
        retirement_monthly_income: 0.0,
        investment_growth_rate: 5.0,
        utility_exponent_pre: 0.0,
        utility_exponent_post: None,
        utility_multiplier_pre: 1.0,
        utility_multiplier_post: 1.7,
        months_per_year: 12,
        min_retirement_age: 34,
        max_retirement_age: 45,
        spending_min: 0.0,
        spending_max: 30_000.0,
        spending_step: 100.0,
        csv: None,
    }
}

fn sweep_request_from_payload(payload: SweepPayload) -> Result<SweepRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.end_age {
        cli.end_age = v;
    }
    if let Some(v) = payload.initial_wealth {
        cli.initial_wealth = v;
    }
    if let Some(v) = payload.initial_monthly_income {
        cli.initial_monthly_income = v;
    }
    if let Some(v) = payload.income_growth_rate {
        cli.income_growth_rate = v;
    }
    if let Some(v) = payload.retirement_monthly_income {
        cli.retirement_monthly_income = v;
    }
    if let Some(v) = payload.investment_growth_rate {
        cli.investment_growth_rate = v;
    }
    if let Some(v) = payload.utility_exponent_pre {
        cli.utility_exponent_pre = v;
    }
    if let Some(v) = payload.utility_exponent_post {
        cli.utility_exponent_post = Some(v);
    }
    if let Some(v) = payload.utility_multiplier_pre {
        cli.utility_multiplier_pre = v;
    }
    if let Some(v) = payload.utility_multiplier_post {
        cli.utility_multiplier_post = v;
    }
    if let Some(v) = payload.months_per_year {
        cli.months_per_year = v;
    }
    if let Some(v) = payload.min_retirement_age {
        cli.min_retirement_age = v;
    }
    if let Some(v) = payload.max_retirement_age {
        cli.max_retirement_age = v;
    }
    if let Some(v) = payload.spending_min {
        cli.spending_min = v;
    }
    if let Some(v) = payload.spending_max {
        cli.spending_max = v;
    }
    if let Some(v) = payload.spending_step {
        cli.spending_step = v;
    }

    build_request(&cli)
}

fn build_sweep_response(request: &SweepRequest, sweep: &SweepResult) -> SweepResponse {
    SweepResponse {
        min_retirement_age: request.min_retirement_age,
        max_retirement_age: request.max_retirement_age,
        spending_min: request.grid.min,
        spending_max: request.grid.max,
        spending_step: request.grid.step,
        best_retirement_age: sweep
            .best_index
            .map(|idx| sweep.age_results[idx].retirement_age),
        age_results: sweep.age_results.clone(),
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/sweep",
            get(sweep_get_handler).post(sweep_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Sustainable-spending API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/sweep");

    axum::serve(listener, app).await
}

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let request = build_request(&cli)?;
    let sweep = run_sweep(
        &request.inputs,
        request.min_retirement_age,
        request.max_retirement_age,
        &request.grid,
    )?;

    print!("{}", report::render_table(&sweep));
    if let Some(idx) = sweep.best_index {
        println!(
            "\nHighest lifetime enjoyment at retirement age {}",
            sweep.age_results[idx].retirement_age
        );
    }

    if let Some(path) = &cli.csv {
        report::write_csv_file(path, &sweep.age_results)?;
        println!("Saved results to {}", path.display());
    }

    Ok(())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn sweep_get_handler(Query(payload): Query<SweepPayload>) -> Response {
    sweep_handler_impl(payload).await
}

async fn sweep_post_handler(Json(payload): Json<SweepPayload>) -> Response {
    sweep_handler_impl(payload).await
}

async fn sweep_handler_impl(payload: SweepPayload) -> Response {
    let request = match sweep_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let sweep = match run_sweep(
        &request.inputs,
        request.min_retirement_age,
        request.max_retirement_age,
        &request.grid,
    ) {
        Ok(sweep) => sweep,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    json_response(StatusCode::OK, build_sweep_response(&request, &sweep))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn sweep_request_from_json(json: &str) -> Result<SweepRequest, String> {
    let payload = serde_json::from_str::<SweepPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    sweep_request_from_payload(payload)
}
