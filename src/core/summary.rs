use super::types::{Projection, Series, SeriesPoint, Summary, YearRecord};

impl Projection {
    /// Calendar year of the terminal record when the capital ran out.
    pub fn depletion_year(&self) -> Option<i32> {
        if self.depleted {
            self.records.last().map(|r| r.calendar_year)
        } else {
            None
        }
    }

    pub fn summary(&self) -> Summary {
        let start_capital = self.records.first().map_or(0.0, |r| r.end_capital);
        let end_capital = self.records.last().map_or(0.0, |r| r.end_capital);
        Summary {
            start_capital,
            end_capital,
            total_profit_tax: self.records.iter().map(|r| r.profit_tax).sum(),
            total_dividend_tax: self.records.iter().map(|r| r.dividend_tax_paid).sum(),
            depleted: self.depleted,
            depletion_year: self.depletion_year(),
        }
    }

    /// The plotted columns, each against calendar year.
    pub fn series(&self) -> Vec<Series> {
        let columns: [(&'static str, fn(&YearRecord) -> f64); 4] = [
            ("End Capital", |r: &YearRecord| r.end_capital),
            ("Profit", |r: &YearRecord| r.profit),
            ("Profit Tax", |r: &YearRecord| r.profit_tax),
            ("Net Withdrawal", |r: &YearRecord| r.net_withdrawal),
        ];
        columns
            .into_iter()
            .map(|(name, value)| Series {
                name,
                points: self
                    .records
                    .iter()
                    .map(|r| SeriesPoint {
                        year: r.calendar_year,
                        value: value(r),
                    })
                    .collect(),
            })
            .collect()
    }
}
