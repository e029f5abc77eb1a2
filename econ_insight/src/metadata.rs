//! Static series catalog
//!
//! Display names, units and categories are configuration, not analysis
//! output. The built-in defaults describe the consumer-economy series of the
//! FRED database; a TOML file can replace or extend them:
//!
//! ```toml
//! [roles]
//! inflation = "PCEPI"
//!
//! [series.PCEPI]
//! name = "PCE Price Index"
//! unit = "index (2017=100)"
//! category = "Inflation"
//! description = "Prices paid for personal consumption"
//! ```

use econ_analysis::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Descriptive facts about one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub name: String,
    pub unit: String,
    pub category: String,
    pub description: String,
}

impl SeriesMetadata {
    pub fn new(name: &str, unit: &str, category: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            category: category.to_string(),
            description: description.to_string(),
        }
    }
}

/// Which series play the fixed roles used by interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorRoles {
    /// Payroll level, in thousands of jobs
    pub employment: String,
    pub unemployment: String,
    /// Price index
    pub inflation: String,
}

impl Default for IndicatorRoles {
    fn default() -> Self {
        Self {
            employment: "PAYEMS".to_string(),
            unemployment: "UNRATE".to_string(),
            inflation: "CPIAUCSL".to_string(),
        }
    }
}

/// Series metadata keyed by series id, plus indicator roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataCatalog {
    pub series: BTreeMap<String, SeriesMetadata>,
    pub roles: IndicatorRoles,
}

impl Default for MetadataCatalog {
    fn default() -> Self {
        Self::fred_defaults()
    }
}

impl MetadataCatalog {
    /// Catalog without any series
    pub fn empty() -> Self {
        Self {
            series: BTreeMap::new(),
            roles: IndicatorRoles::default(),
        }
    }

    /// The seven consumer-economy series
    pub fn fred_defaults() -> Self {
        let entries = [
            (
                "PAYEMS",
                SeriesMetadata::new(
                    "Total Nonfarm Payrolls",
                    "thousands of jobs",
                    "Employment",
                    "Total number of people employed in the US economy, excluding farm workers",
                ),
            ),
            (
                "UNRATE",
                SeriesMetadata::new(
                    "Unemployment Rate",
                    "percent",
                    "Employment",
                    "Percentage of labor force that is unemployed and actively seeking work",
                ),
            ),
            (
                "CPIAUCSL",
                SeriesMetadata::new(
                    "Consumer Price Index",
                    "index (1982-84=100)",
                    "Inflation",
                    "Measure of average change in prices paid by consumers for goods and services",
                ),
            ),
            (
                "DSPIC96",
                SeriesMetadata::new(
                    "Real Disposable Personal Income",
                    "billions of chained 2012 dollars",
                    "Income",
                    "Personal income after taxes, adjusted for inflation",
                ),
            ),
            (
                "PCEC96",
                SeriesMetadata::new(
                    "Personal Consumption Expenditures",
                    "billions of chained 2012 dollars",
                    "Spending",
                    "Total consumer spending on goods and services",
                ),
            ),
            (
                "RSAFS",
                SeriesMetadata::new(
                    "Retail Sales",
                    "millions of dollars",
                    "Retail",
                    "Total retail trade sales excluding food services",
                ),
            ),
            (
                "ECOMSA",
                SeriesMetadata::new(
                    "E-commerce Sales",
                    "millions of dollars",
                    "Retail",
                    "E-commerce retail sales as percent of total retail sales",
                ),
            ),
        ];

        Self {
            series: entries
                .into_iter()
                .map(|(id, meta)| (id.to_string(), meta))
                .collect(),
            roles: IndicatorRoles::default(),
        }
    }

    /// Parse a catalog from TOML. Series listed there are added to, or
    /// override, the built-in defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let overrides: MetadataCatalog = toml::from_str(s).map_err(AnalysisError::from)?;
        let mut catalog = Self::fred_defaults();
        catalog.series.extend(overrides.series);
        catalog.roles = overrides.roles;
        Ok(catalog)
    }

    /// Load a catalog from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            AnalysisError::Config(format!(
                "Failed to read catalog file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn get(&self, series_id: &str) -> Option<&SeriesMetadata> {
        self.series.get(series_id)
    }

    /// Human-readable name, falling back to the id
    pub fn display_name(&self, series_id: &str) -> String {
        self.get(series_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| series_id.to_string())
    }
}
