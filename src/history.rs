//! Historical daily precipitation: cleaning and retrieval.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::{RainfallError, Result};
use crate::services::geocoder::Coordinate;
use crate::services::weather_archive::{RawObservation, WeatherArchive};

/// A day with recorded rainfall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoricalObservation {
    pub date: NaiveDate,
    pub precipitation_mm: f64,
}

/// Cleaned daily series: dates strictly increasing, every value `> 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalSeries {
    observations: Vec<HistoricalObservation>,
}

impl HistoricalSeries {
    /// Builds a cleaned series from raw archive days.
    ///
    /// Days with a missing, zero, negative or non-finite value are dropped:
    /// zero counts as "no data", not "no rain". Rows are sorted by date and
    /// the first row wins on duplicate dates.
    pub fn from_raw(raw: &[RawObservation]) -> Self {
        let mut by_date = BTreeMap::new();
        for day in raw {
            let Some(mm) = day.precipitation_mm else {
                continue;
            };
            if mm.is_finite() && mm > 0.0 {
                by_date.entry(day.date).or_insert(mm);
            }
        }

        Self {
            observations: by_date
                .into_iter()
                .map(|(date, precipitation_mm)| HistoricalObservation {
                    date,
                    precipitation_mm,
                })
                .collect(),
        }
    }

    pub fn observations(&self) -> &[HistoricalObservation] {
        &self.observations
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.precipitation_mm).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Result of a fetch: how many days the archive returned, and what survived cleaning.
#[derive(Debug, Clone)]
pub struct FetchedHistory {
    pub raw_days: usize,
    pub series: HistoricalSeries,
}

/// Fetches and cleans daily precipitation for `coord` over `[start, end]`.
///
/// An empty archive response and a response with no rainy day at all both
/// yield [`RainfallError::EmptyHistoricalData`].
#[tracing::instrument(skip(archive, coord), fields(coord = %coord, start = %start, end = %end))]
pub async fn fetch_history<A: WeatherArchive + ?Sized>(
    archive: &A,
    coord: Coordinate,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<FetchedHistory> {
    if start > end {
        return Err(RainfallError::InvalidDateRange { start, end });
    }

    let raw = archive.daily_precipitation(coord, start, end).await?;
    if raw.is_empty() {
        warn!("Archive returned no days");
        return Err(RainfallError::EmptyHistoricalData { start, end });
    }

    let series = HistoricalSeries::from_raw(&raw);
    info!(
        raw_days = raw.len(),
        cleaned_days = series.len(),
        dropped = raw.len() - series.len(),
        "Historical series cleaned"
    );

    if series.is_empty() {
        warn!("No day with recorded rainfall");
        return Err(RainfallError::EmptyHistoricalData { start, end });
    }

    Ok(FetchedHistory {
        raw_days: raw.len(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(date: NaiveDate, mm: Option<f64>) -> RawObservation {
        RawObservation {
            date,
            precipitation_mm: mm,
        }
    }

    struct FixedArchive(Vec<RawObservation>);

    #[async_trait::async_trait]
    impl WeatherArchive for FixedArchive {
        async fn daily_precipitation(
            &self,
            _coord: Coordinate,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> anyhow::Result<Vec<RawObservation>> {
            Ok(self.0.clone())
        }
    }

    const COORD: Coordinate = Coordinate {
        latitude: 19.0,
        longitude: 72.8,
    };

    #[test]
    fn test_cleaning_drops_zero_and_missing() {
        let series = HistoricalSeries::from_raw(&[
            raw(day(2015, 1, 1), Some(0.0)),
            raw(day(2015, 1, 2), None),
            raw(day(2015, 1, 3), Some(4.2)),
            raw(day(2015, 1, 4), Some(f64::NAN)),
            raw(day(2015, 1, 5), Some(0.1)),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), vec![4.2, 0.1]);
    }

    #[test]
    fn test_cleaning_sorts_and_dedups() {
        let series = HistoricalSeries::from_raw(&[
            raw(day(2015, 1, 3), Some(3.0)),
            raw(day(2015, 1, 1), Some(1.0)),
            raw(day(2015, 1, 3), Some(9.0)),
        ]);
        let dates: Vec<_> = series.observations().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![day(2015, 1, 1), day(2015, 1, 3)]);
        assert_eq!(series.values(), vec![1.0, 3.0]);
    }

    #[tokio::test]
    async fn test_fetch_rejects_inverted_range() {
        let archive = FixedArchive(vec![]);
        let err = fetch_history(&archive, COORD, day(2020, 1, 1), day(2015, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RainfallError::InvalidDateRange { .. }));
    }

    #[tokio::test]
    async fn test_fetch_empty_archive() {
        let archive = FixedArchive(vec![]);
        let err = fetch_history(&archive, COORD, day(2015, 1, 1), day(2015, 12, 31))
            .await
            .unwrap_err();
        assert!(matches!(err, RainfallError::EmptyHistoricalData { .. }));
    }

    #[tokio::test]
    async fn test_fetch_all_dry_days_is_empty() {
        let archive = FixedArchive(vec![
            raw(day(2015, 1, 1), Some(0.0)),
            raw(day(2015, 1, 2), None),
        ]);
        let err = fetch_history(&archive, COORD, day(2015, 1, 1), day(2015, 1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, RainfallError::EmptyHistoricalData { .. }));
    }

    #[tokio::test]
    async fn test_fetch_single_day_range() {
        let archive = FixedArchive(vec![raw(day(2015, 7, 1), Some(22.5))]);
        let fetched = fetch_history(&archive, COORD, day(2015, 7, 1), day(2015, 7, 1))
            .await
            .unwrap();
        assert_eq!(fetched.raw_days, 1);
        assert_eq!(fetched.series.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_cleaned_series_is_positive_and_strictly_increasing(
            days in prop::collection::vec((0i64..2000, prop::option::of(-5.0f64..50.0)), 0..200)
        ) {
            let base = day(2015, 1, 1);
            let rows: Vec<_> = days
                .iter()
                .map(|(offset, mm)| raw(base + chrono::Duration::days(*offset), *mm))
                .collect();

            let series = HistoricalSeries::from_raw(&rows);
            prop_assert!(series.observations().iter().all(|o| o.precipitation_mm > 0.0));
            prop_assert!(series.observations().windows(2).all(|w| w[0].date < w[1].date));
        }
    }
}
