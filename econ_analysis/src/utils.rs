//! Utility functions for the econ_analysis crate

use crate::error::{AnalysisError, Result};
use chrono::{Months, NaiveDate};

/// Monthly dates following `last_date`: step k is `last_date + k months`.
///
/// Day-of-month is clamped at month end (Jan 31 + 1 month = Feb 28/29).
pub fn future_months(last_date: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    (1..=horizon)
        .map(|k| {
            u32::try_from(k)
                .ok()
                .and_then(|k| last_date.checked_add_months(Months::new(k)))
                .ok_or_else(|| {
                    AnalysisError::InvalidParameter(format!(
                        "Cannot step {} months past {}",
                        k, last_date
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_future_months_spacing() {
        let last = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        let dates = future_months(last, 3).unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_future_months_clamps_month_end() {
        let last = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let dates = future_months(last, 2).unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let last = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(future_months(last, 0).unwrap().is_empty());
    }
}
