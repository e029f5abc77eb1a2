//! Outlook classification, risk flags and business implications
//!
//! Every function here is total: a missing or unusable upstream fact turns
//! into an `Unknown` outlook or an absent flag, never an error.

use crate::knowledge::{AnomalyInsight, CurrentValue, ForecastSummary, TrendDirection, TrendInsight};
use crate::metadata::MetadataCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Monthly change (percent) beyond which employment is moving
pub const EMPLOYMENT_CHANGE_THRESHOLD: f64 = 0.1;
/// Anomaly rate (percent) above which a series is flagged as volatile
pub const VOLATILITY_RISK_RATE: f64 = 15.0;
/// Inflation trend magnitude (percent) above which a risk is flagged
pub const INFLATION_TREND_RISK: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentOutlook {
    Declining,
    Stable,
    Growing,
    Unknown,
}

impl fmt::Display for EmploymentOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EmploymentOutlook::Declining => "declining",
            EmploymentOutlook::Stable => "stable",
            EmploymentOutlook::Growing => "growing",
            EmploymentOutlook::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflationOutlook {
    Deflationary,
    LowInflation,
    ModerateInflation,
    HighInflation,
    Unknown,
}

impl fmt::Display for InflationOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InflationOutlook::Deflationary => "deflationary",
            InflationOutlook::LowInflation => "low_inflation",
            InflationOutlook::ModerateInflation => "moderate_inflation",
            InflationOutlook::HighInflation => "high_inflation",
            InflationOutlook::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Strict comparisons: a change of exactly ±0.1 is stable
pub fn classify_employment_change(change_percent: f64) -> EmploymentOutlook {
    if change_percent < -EMPLOYMENT_CHANGE_THRESHOLD {
        EmploymentOutlook::Declining
    } else if change_percent > EMPLOYMENT_CHANGE_THRESHOLD {
        EmploymentOutlook::Growing
    } else {
        EmploymentOutlook::Stable
    }
}

/// Buckets are half-open: [-1, 2) low, [2, 4) moderate, 4 and above high
pub fn classify_inflation_rate(annual_percent: f64) -> InflationOutlook {
    if annual_percent < -1.0 {
        InflationOutlook::Deflationary
    } else if annual_percent < 2.0 {
        InflationOutlook::LowInflation
    } else if annual_percent < 4.0 {
        InflationOutlook::ModerateInflation
    } else {
        InflationOutlook::HighInflation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmploymentContext {
    pub outlook: EmploymentOutlook,
    pub current_jobs_thousands: Option<f64>,
    pub forecast_change_percent: Option<f64>,
}

impl EmploymentContext {
    pub fn unknown() -> Self {
        Self {
            outlook: EmploymentOutlook::Unknown,
            current_jobs_thousands: None,
            forecast_change_percent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflationContext {
    pub outlook: InflationOutlook,
    pub current_cpi: Option<f64>,
    pub forecasted_inflation_annual: Option<f64>,
}

impl InflationContext {
    pub fn unknown() -> Self {
        Self {
            outlook: InflationOutlook::Unknown,
            current_cpi: None,
            forecasted_inflation_annual: None,
        }
    }
}

/// Percent change from `current` to `next`, times `periods`. Scaling happens
/// before the division so round thresholds land exactly.
fn scaled_percent_change(current: f64, next: f64, periods: f64) -> Option<f64> {
    if current == 0.0 {
        return None;
    }
    let change = (next - current) * 100.0 * periods / current;
    change.is_finite().then_some(change)
}

/// Outlook from the current payroll level and its next forecast
pub fn interpret_employment(current: Option<f64>, next_forecast: Option<f64>) -> EmploymentContext {
    let (Some(current), Some(next)) = (current, next_forecast) else {
        debug!("Employment outlook unknown: missing current value or forecast");
        return EmploymentContext {
            current_jobs_thousands: current,
            ..EmploymentContext::unknown()
        };
    };
    match scaled_percent_change(current, next, 1.0) {
        Some(change) => EmploymentContext {
            outlook: classify_employment_change(change),
            current_jobs_thousands: Some(current),
            forecast_change_percent: Some(change),
        },
        None => {
            debug!("Employment outlook unknown: zero base");
            EmploymentContext {
                current_jobs_thousands: Some(current),
                ..EmploymentContext::unknown()
            }
        }
    }
}

/// Outlook from the current price index and its next forecast, annualised
/// from a one-month change.
pub fn interpret_inflation(current: Option<f64>, next_forecast: Option<f64>) -> InflationContext {
    let (Some(current), Some(next)) = (current, next_forecast) else {
        debug!("Inflation outlook unknown: missing current value or forecast");
        return InflationContext {
            current_cpi: current,
            ..InflationContext::unknown()
        };
    };
    match scaled_percent_change(current, next, 12.0) {
        Some(annual) => InflationContext {
            outlook: classify_inflation_rate(annual),
            current_cpi: Some(current),
            forecasted_inflation_annual: Some(annual),
        },
        None => {
            debug!("Inflation outlook unknown: zero base");
            InflationContext {
                current_cpi: Some(current),
                ..InflationContext::unknown()
            }
        }
    }
}

/// Narrative layer of the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicContext {
    pub employment: EmploymentContext,
    pub inflation: InflationContext,
    pub key_risks: Vec<String>,
    pub business_implications: Vec<String>,
}

/// Facts the narrative layer reads
pub struct ContextInputs<'a> {
    pub current: &'a BTreeMap<String, CurrentValue>,
    pub forecasts: &'a BTreeMap<String, ForecastSummary>,
    pub trends: &'a BTreeMap<String, TrendInsight>,
    pub anomalies: &'a BTreeMap<String, AnomalyInsight>,
    pub catalog: &'a MetadataCatalog,
}

impl ContextInputs<'_> {
    fn current_value(&self, series_id: &str) -> Option<f64> {
        self.current.get(series_id).map(|c| c.value)
    }

    fn next_forecast(&self, series_id: &str) -> Option<f64> {
        self.forecasts
            .get(series_id)
            .and_then(|f| f.next_3_months.first().copied())
    }
}

impl EconomicContext {
    pub fn derive(inputs: &ContextInputs<'_>) -> Self {
        let roles = &inputs.catalog.roles;
        let employment = interpret_employment(
            inputs.current_value(&roles.employment),
            inputs.next_forecast(&roles.employment),
        );
        let inflation = interpret_inflation(
            inputs.current_value(&roles.inflation),
            inputs.next_forecast(&roles.inflation),
        );

        let mut key_risks = Vec::new();
        for (id, anomaly) in inputs.anomalies {
            if anomaly.anomaly_rate_percent > VOLATILITY_RISK_RATE {
                key_risks.push(format!(
                    "High volatility detected in {}",
                    inputs.catalog.display_name(id)
                ));
            }
        }
        if inputs
            .trends
            .get(&roles.unemployment)
            .is_some_and(|t| t.direction == TrendDirection::Increasing)
        {
            key_risks.push("Rising unemployment trend detected".to_string());
        }
        if inputs
            .trends
            .get(&roles.inflation)
            .is_some_and(|t| t.magnitude_percent > INFLATION_TREND_RISK)
        {
            key_risks.push("Significant inflation changes detected".to_string());
        }

        let mut business_implications = Vec::new();
        if employment.outlook == EmploymentOutlook::Declining {
            business_implications.push(
                "Potential reduction in consumer spending power due to employment decline"
                    .to_string(),
            );
        }
        match inflation.outlook {
            InflationOutlook::Deflationary => business_implications
                .push("Deflationary environment may impact pricing strategies".to_string()),
            InflationOutlook::HighInflation => business_implications
                .push("High inflation may reduce consumer purchasing power".to_string()),
            _ => {}
        }

        Self {
            employment,
            inflation,
            key_risks,
            business_implications,
        }
    }
}
