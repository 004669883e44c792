use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Datelike;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{Params, Projection, Series, Summary, YearRecord, project};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Upper bound on the projection horizon accepted from users.
pub const MAX_YEARS: i32 = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    start_capital: Option<f64>,
    annual_return: Option<f64>,
    inflation: Option<f64>,
    net_withdrawal: Option<f64>,
    tax_threshold: Option<f64>,
    tax_low: Option<f64>,
    tax_high: Option<f64>,
    dividend_tax: Option<f64>,
    years: Option<i32>,
    base_year: Option<i32>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dga-sim",
    about = "DGA withdrawal simulator (progressive profit tax + dividend tax)"
)]
pub struct Cli {
    #[arg(long, default_value_t = 250_000.0, help = "Starting capital in euros")]
    start_capital: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        allow_negative_numbers = true,
        help = "Average annual return in percent"
    )]
    annual_return: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        allow_negative_numbers = true,
        help = "Inflation in percent"
    )]
    inflation: f64,
    #[arg(
        long,
        default_value_t = 30_000.0,
        help = "Net withdrawal in the first year, in euros"
    )]
    net_withdrawal: f64,
    #[arg(
        long,
        default_value_t = 200_000.0,
        help = "Profit threshold for the lower tax rate, in euros"
    )]
    tax_threshold: f64,
    #[arg(long, default_value_t = 19.0, help = "Profit tax below the threshold in percent")]
    tax_low: f64,
    #[arg(long, default_value_t = 25.8, help = "Profit tax above the threshold in percent")]
    tax_high: f64,
    #[arg(long, default_value_t = 25.0, help = "Dividend tax in percent")]
    dividend_tax: f64,
    #[arg(
        long,
        default_value_t = 30,
        allow_negative_numbers = true,
        help = "Projection period in years"
    )]
    years: i32,
    #[arg(long, help = "Calendar year of the starting row, defaults to the current year")]
    base_year: Option<i32>,
    #[arg(long, help = "Print the projection as JSON instead of a table")]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    params: Params,
    summary: Summary,
    years: Vec<YearRecord>,
    series: Vec<Series>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(cli: &Cli) -> Result<Params, String> {
    if !cli.start_capital.is_finite() || cli.start_capital < 0.0 {
        return Err("--start-capital must be >= 0".to_string());
    }

    if !cli.net_withdrawal.is_finite() || cli.net_withdrawal < 0.0 {
        return Err("--net-withdrawal must be >= 0".to_string());
    }

    if !cli.tax_threshold.is_finite() || cli.tax_threshold < 0.0 {
        return Err("--tax-threshold must be >= 0".to_string());
    }

    for (name, rate) in [
        ("--tax-low", cli.tax_low),
        ("--tax-high", cli.tax_high),
        ("--dividend-tax", cli.dividend_tax),
    ] {
        if !(0.0..=100.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if cli.years > MAX_YEARS {
        return Err(format!("--years must be <= {MAX_YEARS}"));
    }

    Ok(Params {
        start_capital: cli.start_capital,
        annual_return: cli.annual_return / 100.0,
        inflation: cli.inflation / 100.0,
        net_withdrawal: cli.net_withdrawal,
        tax_threshold: cli.tax_threshold,
        tax_low: cli.tax_low / 100.0,
        tax_high: cli.tax_high / 100.0,
        dividend_tax: cli.dividend_tax / 100.0,
        years: cli.years,
        base_year: cli.base_year.unwrap_or_else(current_year),
    })
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn default_cli() -> Cli {
    Cli {
        start_capital: 250_000.0,
        annual_return: 4.0,
        inflation: 2.0,
        net_withdrawal: 30_000.0,
        tax_threshold: 200_000.0,
        tax_low: 19.0,
        tax_high: 25.8,
        dividend_tax: 25.0,
        years: 30,
        base_year: None,
        json: false,
    }
}

fn params_from_payload(payload: ProjectPayload) -> Result<Params, String> {
    let mut cli = default_cli();

    if let Some(v) = payload.start_capital {
        cli.start_capital = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.inflation {
        cli.inflation = v;
    }
    if let Some(v) = payload.net_withdrawal {
        cli.net_withdrawal = v;
    }
    if let Some(v) = payload.tax_threshold {
        cli.tax_threshold = v;
    }
    if let Some(v) = payload.tax_low {
        cli.tax_low = v;
    }
    if let Some(v) = payload.tax_high {
        cli.tax_high = v;
    }
    if let Some(v) = payload.dividend_tax {
        cli.dividend_tax = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.base_year {
        cli.base_year = Some(v);
    }

    build_params(&cli)
}

#[cfg(test)]
fn params_from_json(json: &str) -> Result<Params, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    params_from_payload(payload)
}

fn build_project_response(params: Params) -> Result<ProjectResponse, String> {
    log::debug!(
        "projecting {} years from {:.0} starting {}",
        params.years,
        params.start_capital,
        params.base_year
    );
    let projection = project(&params).map_err(|e| e.to_string())?;
    if let Some(year) = projection.depletion_year() {
        log::info!("capital depleted in {year}");
    }

    Ok(ProjectResponse {
        params,
        summary: projection.summary(),
        series: projection.series(),
        years: projection.records,
    })
}

/// Runs one projection for the command line and returns the text to print.
pub fn run_cli(cli: Cli) -> Result<String, String> {
    let params = build_params(&cli)?;
    if cli.json {
        let response = build_project_response(params)?;
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| format!("Failed to serialize projection: {e}"))?;
        return Ok(format!("{json}\n"));
    }

    let projection = project(&params).map_err(|e| e.to_string())?;
    Ok(render_report(&projection))
}

fn render_report(projection: &Projection) -> String {
    let summary = projection.summary();
    let mut out = String::new();

    if let Some(year) = summary.depletion_year {
        out.push_str(&format!("Capital depleted in year {year}!\n"));
        out.push('\n');
    }

    for (label, value) in [
        ("Starting Capital", summary.start_capital),
        ("End Capital", summary.end_capital),
        ("Total Profit Tax", summary.total_profit_tax),
        ("Total Dividend Tax", summary.total_dividend_tax),
    ] {
        out.push_str(&format!("{label:<20}{:>16}\n", format_euros(value)));
    }
    out.push('\n');
    out.push_str(&render_table(&projection.records));
    out
}

const TABLE_HEADERS: [&str; 7] = [
    "Calendar Year",
    "Profit",
    "Profit Tax",
    "Dividend Tax",
    "Gross Withdrawal",
    "Net Withdrawal",
    "End Capital",
];

fn render_table(records: &[YearRecord]) -> String {
    let rows: Vec<[String; 7]> = records
        .iter()
        .map(|r| {
            [
                r.calendar_year.to_string(),
                format_euros(r.profit),
                format_euros(r.profit_tax),
                format_euros(r.dividend_tax_paid),
                format_euros(r.gross_withdrawal),
                format_euros(r.net_withdrawal),
                format_euros(r.end_capital),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, TABLE_HEADERS.as_slice(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, rule.as_slice(), &widths);
    for row in &rows {
        push_row(&mut out, row.as_slice(), &widths);
    }
    out
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize; 7]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let cell = cell.as_ref();
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{cell}", " ".repeat(pad))
        })
        .collect();
    out.push_str(&line.join("  "));
    out.push('\n');
}

/// Whole euros with comma thousands separators, e.g. `€ 218,100`.
fn format_euros(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("€ -{grouped}")
    } else {
        format!("€ {grouped}")
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("DGA withdrawal API bound to {addr}");
    println!("DGA withdrawal API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(payload: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let response = params_from_payload(payload).and_then(build_project_response);
    match response {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => bad_request(msg),
    }
}

fn bad_request(msg: String) -> Response {
    log::warn!("rejected projection request: {msg}");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
