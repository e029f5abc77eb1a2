//! Feature engineering for anomaly detection

use crate::data::TimeSeries;
use crate::error::Result;
use chrono::NaiveDate;
use econ_math::rolling::{lag, pct_change, rolling_mean, rolling_std};

/// Column names of a feature row, in order
pub const FEATURE_NAMES: [&str; 6] = [
    "value",
    "lag_1",
    "lag_3",
    "rolling_mean_6",
    "rolling_std_6",
    "yoy_change",
];

const ROLLING_WINDOW: usize = 6;
const ROLLING_MIN_PERIODS: usize = 3;
const YEAR_LAG: usize = 12;

/// Engineered features of one observation
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub value: f64,
    pub features: [f64; 6],
}

/// Build feature rows, dropping observations with any undefined feature.
///
/// With monthly data the year-over-year change needs twelve prior points,
/// so the first twelve observations never produce a row.
pub fn engineer_features(series: &TimeSeries) -> Result<Vec<FeatureRow>> {
    let values = series.values();
    let lag_1 = lag(&values, 1);
    let lag_3 = lag(&values, 3);
    let mean_6 = rolling_mean(&values, ROLLING_WINDOW, ROLLING_MIN_PERIODS)?;
    let std_6 = rolling_std(&values, ROLLING_WINDOW, ROLLING_MIN_PERIODS)?;
    let yoy = pct_change(&values, YEAR_LAG);

    let rows = series
        .points()
        .iter()
        .enumerate()
        .filter_map(|(i, point)| {
            Some(FeatureRow {
                date: point.date,
                value: point.value,
                features: [
                    point.value,
                    lag_1[i]?,
                    lag_3[i]?,
                    mean_6[i]?,
                    std_6[i]?,
                    yoy[i]? * 100.0,
                ],
            })
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Months;

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let pairs: Vec<(NaiveDate, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (start + Months::new(i as u32), v))
            .collect();
        TimeSeries::from_pairs("X", &pairs).unwrap()
    }

    #[test]
    fn test_first_year_is_dropped() {
        let values: Vec<f64> = (1..=24).map(|i| i as f64).collect();
        let rows = engineer_features(&series(&values)).unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].value, 13.0);
    }

    #[test]
    fn test_feature_values() {
        let values: Vec<f64> = (1..=14).map(|i| i as f64).collect();
        let rows = engineer_features(&series(&values)).unwrap();
        let row = &rows[0];
        assert_eq!(row.features[0], 13.0);
        assert_eq!(row.features[1], 12.0);
        assert_eq!(row.features[2], 10.0);
        assert_relative_eq!(row.features[3], 10.5);
        // sample std of 8..=13
        assert_relative_eq!(row.features[4], 3.5_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(row.features[5], 1200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_base_year_is_dropped() {
        let mut values: Vec<f64> = (1..=14).map(|i| i as f64).collect();
        values[0] = 0.0;
        let rows = engineer_features(&series(&values)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 14.0);
    }
}
