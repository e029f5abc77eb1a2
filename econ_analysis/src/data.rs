//! Time series data model
//!
//! A [`TimeSeries`] is the validated, date-ordered view of one indicator.
//! A [`SeriesPanel`] aligns several series on the union of their dates in a
//! polars frame, leaving missing observations null.

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One observation of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub series_id: String,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: f64, series_id: impl Into<String>) -> Self {
        Self {
            date,
            value,
            series_id: series_id.into(),
        }
    }
}

/// Ordered observations of a single series
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    series_id: String,
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    /// Create a series from points that are already sorted.
    ///
    /// Dates must be strictly ascending, values finite and every point must
    /// carry `series_id`.
    pub fn new(series_id: impl Into<String>, points: Vec<TimeSeriesPoint>) -> Result<Self> {
        let series_id = series_id.into();

        if let Some(p) = points.iter().find(|p| p.series_id != series_id) {
            return Err(AnalysisError::DataError(format!(
                "Point for {} found in series {}",
                p.series_id, series_id
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(AnalysisError::DataError(format!(
                "Non-finite value in {} at {}",
                series_id, p.date
            )));
        }
        if let Some(w) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(AnalysisError::DataError(format!(
                "Dates in {} must be strictly ascending ({} then {})",
                series_id, w[0].date, w[1].date
            )));
        }

        Ok(Self { series_id, points })
    }

    /// Build a series from `(date, value)` pairs
    pub fn from_pairs(series_id: &str, pairs: &[(NaiveDate, f64)]) -> Result<Self> {
        let points = pairs
            .iter()
            .map(|&(date, value)| TimeSeriesPoint::new(date, value, series_id))
            .collect();
        Self::new(series_id, points)
    }

    pub fn series_id(&self) -> &str {
        &self.series_id
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    /// Observation values in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Observation dates in ascending order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&TimeSeriesPoint> {
        self.points.first()
    }

    /// Most recent observation
    pub fn last(&self) -> Option<&TimeSeriesPoint> {
        self.points.last()
    }

    /// The trailing `n` observations (all of them if fewer)
    pub fn tail(&self, n: usize) -> &[TimeSeriesPoint] {
        &self.points[self.points.len().saturating_sub(n)..]
    }

    /// Fail with `InsufficientData` when shorter than `required`
    pub fn require_len(&self, required: usize) -> Result<()> {
        if self.points.len() < required {
            return Err(AnalysisError::InsufficientData {
                series_id: self.series_id.clone(),
                required,
                actual: self.points.len(),
            });
        }
        Ok(())
    }
}

/// Several series aligned on the union of their dates
#[derive(Debug, Clone)]
pub struct SeriesPanel {
    dates: Vec<NaiveDate>,
    df: DataFrame,
    series_ids: Vec<String>,
}

impl SeriesPanel {
    /// Outer-join the given series on date.
    ///
    /// The frame holds one nullable `f64` column per series, named by series
    /// id in input order; row `i` belongs to `dates()[i]`. Dates are kept
    /// outside the frame so any id is a usable column name.
    pub fn from_series(series: &[TimeSeries]) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for s in series {
            if !seen.insert(s.series_id()) {
                return Err(AnalysisError::DataError(format!(
                    "Duplicate series id in panel: {}",
                    s.series_id()
                )));
            }
        }

        let dates: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points().iter().map(|p| p.date))
            .collect();

        let mut columns = Vec::with_capacity(series.len());
        for s in series {
            let by_date: BTreeMap<NaiveDate, f64> =
                s.points().iter().map(|p| (p.date, p.value)).collect();
            let aligned: Vec<Option<f64>> =
                dates.iter().map(|d| by_date.get(d).copied()).collect();
            columns.push(Series::new(s.series_id(), aligned));
        }

        let df = DataFrame::new(columns)?;
        Ok(Self {
            dates: dates.into_iter().collect(),
            df,
            series_ids: series.iter().map(|s| s.series_id().to_string()).collect(),
        })
    }

    /// Series ids in column order
    pub fn series_ids(&self) -> &[String] {
        &self.series_ids
    }

    /// Number of aligned dates
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    /// A panel with no series or no dates
    pub fn is_empty(&self) -> bool {
        self.series_ids.is_empty() || self.dates.is_empty()
    }

    /// Aligned dates in ascending order
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Values of one series aligned to [`SeriesPanel::dates`], `None` where absent
    pub fn column(&self, series_id: &str) -> Result<Vec<Option<f64>>> {
        if !self.series_ids.iter().any(|id| id == series_id) {
            return Err(AnalysisError::SeriesNotFound(series_id.to_string()));
        }
        Ok(self.df.column(series_id)?.f64()?.into_iter().collect())
    }

    /// The underlying frame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let result = TimeSeries::from_pairs("UNRATE", &[(d(2020, 2), 1.0), (d(2020, 1), 2.0)]);
        assert!(matches!(result, Err(AnalysisError::DataError(_))));
    }

    #[test]
    fn test_rejects_duplicate_dates() {
        let result = TimeSeries::from_pairs("UNRATE", &[(d(2020, 1), 1.0), (d(2020, 1), 2.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tail_and_require_len() {
        let series =
            TimeSeries::from_pairs("X", &[(d(2020, 1), 1.0), (d(2020, 2), 2.0), (d(2020, 3), 3.0)])
                .unwrap();
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(10).len(), 3);
        assert!(series.require_len(3).is_ok());
        assert!(matches!(
            series.require_len(4),
            Err(AnalysisError::InsufficientData {
                required: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_panel_outer_join_keeps_nulls() {
        let a = TimeSeries::from_pairs("A", &[(d(2020, 1), 1.0), (d(2020, 2), 2.0)]).unwrap();
        let b = TimeSeries::from_pairs("B", &[(d(2020, 2), 20.0), (d(2020, 3), 30.0)]).unwrap();
        let panel = SeriesPanel::from_series(&[a, b]).unwrap();

        assert_eq!(panel.height(), 3);
        assert_eq!(panel.dates(), &[d(2020, 1), d(2020, 2), d(2020, 3)]);
        assert_eq!(panel.column("A").unwrap(), vec![Some(1.0), Some(2.0), None]);
        assert_eq!(panel.column("B").unwrap(), vec![None, Some(20.0), Some(30.0)]);
        assert!(matches!(
            panel.column("C"),
            Err(AnalysisError::SeriesNotFound(_))
        ));
    }

    #[test]
    fn test_panel_accepts_any_series_id() {
        let date = TimeSeries::from_pairs("date", &[(d(2021, 1), 5.0), (d(2021, 2), 6.0)]).unwrap();
        let other = TimeSeries::from_pairs("UNRATE", &[(d(2021, 2), 4.0)]).unwrap();
        let panel = SeriesPanel::from_series(&[date, other]).unwrap();

        assert_eq!(panel.series_ids(), &["date".to_string(), "UNRATE".to_string()]);
        assert_eq!(panel.dates(), &[d(2021, 1), d(2021, 2)]);
        assert_eq!(panel.column("date").unwrap(), vec![Some(5.0), Some(6.0)]);
        assert_eq!(panel.column("UNRATE").unwrap(), vec![None, Some(4.0)]);
    }

    #[test]
    fn test_duplicate_series_id_is_data_error() {
        let a = TimeSeries::from_pairs("A", &[(d(2021, 1), 1.0)]).unwrap();
        let result = SeriesPanel::from_series(&[a.clone(), a]);
        assert!(matches!(result, Err(AnalysisError::DataError(_))));
    }

    #[test]
    fn test_empty_panel() {
        let panel = SeriesPanel::from_series(&[]).unwrap();
        assert!(panel.is_empty());
    }
}
