//! Wet-season detection from historical rainfall.

use chrono::Datelike;
use serde::Serialize;
use std::fmt;

use crate::forecast::utility::mean;
use crate::history::HistoricalSeries;

/// Accumulated rainfall of one calendar month of record (e.g. July 2017).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthTotal {
    pub year: i32,
    pub month: u32,
    pub total_mm: f64,
}

/// Calendar months (1–12) forming the wet season, wettest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeasonMonths(Vec<u32>);

impl SeasonMonths {
    pub fn new(months: Vec<u32>) -> Self {
        Self(months)
    }

    /// Months in rank order.
    pub fn months(&self) -> &[u32] {
        &self.0
    }

    pub fn contains(&self, month: u32) -> bool {
        self.0.contains(&month)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SeasonMonths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let months: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", months.join(" "))
    }
}

/// Sums rainfall per month of record, from the first observed month to the
/// last. Months in between without observations appear with a zero total.
pub fn monthly_totals(series: &HistoricalSeries) -> Vec<MonthTotal> {
    let observations = series.observations();
    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return Vec::new();
    };

    let mut totals = Vec::new();
    let (mut year, mut month) = (first.date.year(), first.date.month());
    let mut rest = observations.iter().peekable();

    loop {
        let mut total_mm = 0.0;
        while let Some(obs) = rest.next_if(|o| o.date.year() == year && o.date.month() == month) {
            total_mm += obs.precipitation_mm;
        }
        totals.push(MonthTotal {
            year,
            month,
            total_mm,
        });

        if (year, month) == (last.date.year(), last.date.month()) {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    totals
}

/// Averages the monthly totals of each calendar month across the years on
/// record. Index 0 is January; `None` marks a month with no observation at all.
pub fn monthly_means(series: &HistoricalSeries) -> [Option<f64>; 12] {
    let mut totals: [Vec<f64>; 12] = Default::default();
    let mut observed = [false; 12];

    for obs in series.observations() {
        observed[obs.date.month0() as usize] = true;
    }
    for total in monthly_totals(series) {
        totals[(total.month - 1) as usize].push(total.total_mm);
    }

    let mut means = [None; 12];
    for (i, slot) in means.iter_mut().enumerate() {
        if observed[i] {
            *slot = Some(mean(&totals[i]));
        }
    }
    means
}

/// Picks the `count` calendar months with the highest average monthly
/// rainfall.
///
/// Ties keep ascending month order. When fewer than `count` months have any
/// observation, all of them are returned.
pub fn detect_season_months(series: &HistoricalSeries, count: usize) -> SeasonMonths {
    let mut ranked: Vec<(u32, f64)> = monthly_means(series)
        .iter()
        .enumerate()
        .filter_map(|(i, avg)| avg.map(|avg| (i as u32 + 1, avg)))
        .collect();

    // stable: equal averages stay in month order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    SeasonMonths(ranked.into_iter().take(count).map(|(month, _)| month).collect())
}
