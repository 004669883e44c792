use chrono::Datelike;
use serde::Serialize;
use thiserror::Error;

/// Parameters for a single projection run.
///
/// Rates are fractions (`0.04` is 4%). Monetary amounts are euros.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    /// Capital at the start of the run. Default 250 000.
    pub start_capital: f64,
    /// Expected yearly return on opening capital. Default 4%.
    pub annual_return: f64,
    /// Yearly inflation applied to the withdrawal from year 2 onwards. Default 2%.
    pub inflation: f64,
    /// Net amount the owner receives in year 1. Default 30 000.
    pub net_withdrawal: f64,
    /// Profit level where the high profit-tax bracket starts. Default 200 000.
    pub tax_threshold: f64,
    /// Profit-tax rate up to the threshold. Default 19%.
    pub tax_low: f64,
    /// Marginal profit-tax rate above the threshold. Default 25.8%.
    pub tax_high: f64,
    /// Flat tax withheld on the gross distribution. Default 25%.
    pub dividend_tax: f64,
    /// Number of years to project. Default 30.
    pub years: i32,
    /// Calendar year of the baseline record. Defaults to the current year.
    pub base_year: i32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            start_capital: 250_000.0,
            annual_return: 0.04,
            inflation: 0.02,
            net_withdrawal: 30_000.0,
            tax_threshold: 200_000.0,
            tax_low: 0.19,
            tax_high: 0.258,
            dividend_tax: 0.25,
            years: 30,
            base_year: chrono::Local::now().year(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub calendar_year: i32,
    pub profit: f64,
    pub profit_tax: f64,
    pub dividend_tax_paid: f64,
    pub gross_withdrawal: f64,
    pub net_withdrawal: f64,
    pub end_capital: f64,
}

impl YearRecord {
    pub(crate) fn baseline(calendar_year: i32, capital: f64) -> Self {
        Self {
            calendar_year,
            profit: 0.0,
            profit_tax: 0.0,
            dividend_tax_paid: 0.0,
            gross_withdrawal: 0.0,
            net_withdrawal: 0.0,
            end_capital: capital,
        }
    }
}

/// Ordered yearly records of one run, starting with the year-0 baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub records: Vec<YearRecord>,
    pub depleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub start_capital: f64,
    pub end_capital: f64,
    pub total_profit_tax: f64,
    pub total_dividend_tax: f64,
    pub depleted: bool,
    pub depletion_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub name: &'static str,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("dividend tax of 100% leaves nothing to distribute")]
    DividendTaxIsOne,
    #[error("start capital must be >= 0, got {0}")]
    NegativeStartCapital(f64),
    #[error("years must be >= 0, got {0}")]
    NegativeYears(i32),
    #[error("base year {base_year} plus {years} years does not fit a calendar year")]
    CalendarYearOverflow { base_year: i32, years: i32 },
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
}
