use super::types::{ConfigError, Params, Projection, YearRecord};

// Most runs deplete early, so only reserve up to a realistic horizon.
const RESERVED_YEARS: usize = 200;

#[derive(Debug, Clone, Copy)]
struct YearOutcome {
    record: YearRecord,
    depleted: bool,
}

/// Projects capital year by year until the horizon is reached or the capital
/// runs out. The first record is the year-0 baseline.
pub fn project(params: &Params) -> Result<Projection, ConfigError> {
    validate_params(params)?;

    let mut records = Vec::with_capacity((params.years as usize).min(RESERVED_YEARS) + 1);
    records.push(YearRecord::baseline(params.base_year, params.start_capital));

    let mut capital = params.start_capital;
    let mut depleted = false;
    for year in 1..=params.years {
        let outcome = simulate_year(params, capital, year);
        capital = outcome.record.end_capital;
        records.push(outcome.record);
        if outcome.depleted {
            depleted = true;
            break;
        }
    }

    Ok(Projection { records, depleted })
}

fn validate_params(params: &Params) -> Result<(), ConfigError> {
    for (field, value) in [
        ("start_capital", params.start_capital),
        ("annual_return", params.annual_return),
        ("inflation", params.inflation),
        ("net_withdrawal", params.net_withdrawal),
        ("tax_threshold", params.tax_threshold),
        ("tax_low", params.tax_low),
        ("tax_high", params.tax_high),
        ("dividend_tax", params.dividend_tax),
    ] {
        if !value.is_finite() {
            return Err(ConfigError::NonFinite { field });
        }
    }

    if params.dividend_tax == 1.0 {
        return Err(ConfigError::DividendTaxIsOne);
    }
    if params.start_capital < 0.0 {
        return Err(ConfigError::NegativeStartCapital(params.start_capital));
    }
    if params.years < 0 {
        return Err(ConfigError::NegativeYears(params.years));
    }
    if params.base_year.checked_add(params.years).is_none() {
        return Err(ConfigError::CalendarYearOverflow {
            base_year: params.base_year,
            years: params.years,
        });
    }
    Ok(())
}

fn simulate_year(params: &Params, capital: f64, year: i32) -> YearOutcome {
    let profit = capital * params.annual_return;
    let profit_tax = progressive_profit_tax(profit, params);

    let mut net_withdrawal = inflation_adjusted_withdrawal(params, year);
    let mut gross_withdrawal = net_withdrawal / (1.0 - params.dividend_tax);
    let mut dividend_tax_paid = gross_withdrawal * params.dividend_tax;

    let projected_capital = capital + profit - profit_tax - gross_withdrawal;
    let depleted = projected_capital < 0.0;
    let end_capital = if depleted {
        // Shrink the final distribution so capital lands on exactly zero. A
        // year whose losses exceed the capital distributes nothing.
        gross_withdrawal = (gross_withdrawal + projected_capital).max(0.0);
        net_withdrawal = gross_withdrawal * (1.0 - params.dividend_tax);
        dividend_tax_paid = gross_withdrawal * params.dividend_tax;
        0.0
    } else {
        projected_capital
    };

    YearOutcome {
        record: YearRecord {
            calendar_year: params.base_year + year,
            profit,
            profit_tax,
            dividend_tax_paid,
            gross_withdrawal,
            net_withdrawal,
            end_capital,
        },
        depleted,
    }
}

/// Two-bracket corporate tax. Losses are taxed at the low rate too, which
/// yields a negative tax (a refund).
fn progressive_profit_tax(profit: f64, params: &Params) -> f64 {
    if profit <= params.tax_threshold {
        profit * params.tax_low
    } else {
        params.tax_threshold * params.tax_low + (profit - params.tax_threshold) * params.tax_high
    }
}

fn inflation_adjusted_withdrawal(params: &Params, year: i32) -> f64 {
    params.net_withdrawal * (1.0 + params.inflation).powi(year - 1)
}
