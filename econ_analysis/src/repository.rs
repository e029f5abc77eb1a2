//! Series repository contract and implementations
//!
//! The analysis engines never talk to a database or an HTTP API directly.
//! They read through [`SeriesRepository`], which hands out date-ordered,
//! de-duplicated series and date-aligned panels.

use crate::config::RetryConfig;
use crate::data::{SeriesPanel, TimeSeries, TimeSeriesPoint};
use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::thread;
use tracing::{debug, error, info, warn};

/// Latest observation of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentObservation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Read access to stored indicator series
pub trait SeriesRepository: Send + Sync {
    /// Ids of every known series, sorted
    fn series_ids(&self) -> Result<Vec<String>>;

    /// One series, sorted by date with duplicate dates collapsed.
    ///
    /// Fails with `SeriesNotFound` for an unknown id and `EmptyResult` when
    /// the series is known but holds no observations.
    fn get_series(&self, series_id: &str) -> Result<TimeSeries>;

    /// All known series outer-joined on date
    fn get_all_series_panel(&self) -> Result<SeriesPanel> {
        let mut series = Vec::new();
        for id in self.series_ids()? {
            match self.get_series(&id) {
                Ok(s) => series.push(s),
                Err(AnalysisError::EmptyResult(_)) => {
                    debug!("Series {} has no observations, left out of panel", id)
                }
                Err(e) => return Err(e),
            }
        }
        SeriesPanel::from_series(&series)
    }

    /// Value at each series' own most recent date
    fn current_values(&self) -> Result<BTreeMap<String, CurrentObservation>> {
        let mut current = BTreeMap::new();
        for id in self.series_ids()? {
            match self.get_series(&id) {
                Ok(series) => {
                    if let Some(last) = series.last() {
                        current.insert(
                            id,
                            CurrentObservation {
                                date: last.date,
                                value: last.value,
                            },
                        );
                    }
                }
                Err(AnalysisError::EmptyResult(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(current)
    }
}

/// Repository held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySeriesRepository {
    series: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl InMemorySeriesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from points in any order; later writes of a date win
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = TimeSeriesPoint>,
    {
        let mut repo = Self::new();
        for p in points {
            repo.upsert(p);
        }
        repo
    }

    /// Insert or overwrite one observation
    pub fn upsert(&mut self, point: TimeSeriesPoint) {
        self.series
            .entry(point.series_id)
            .or_default()
            .insert(point.date, point.value);
    }

    /// Make a series known without observations
    pub fn register(&mut self, series_id: impl Into<String>) {
        self.series.entry(series_id.into()).or_default();
    }

    /// Add a whole series
    pub fn insert_series(&mut self, series: &TimeSeries) {
        self.register(series.series_id());
        for p in series.points() {
            self.upsert(p.clone());
        }
    }
}

impl SeriesRepository for InMemorySeriesRepository {
    fn series_ids(&self) -> Result<Vec<String>> {
        Ok(self.series.keys().cloned().collect())
    }

    fn get_series(&self, series_id: &str) -> Result<TimeSeries> {
        let observations = self
            .series
            .get(series_id)
            .ok_or_else(|| AnalysisError::SeriesNotFound(series_id.to_string()))?;
        if observations.is_empty() {
            return Err(AnalysisError::EmptyResult(series_id.to_string()));
        }
        let points = observations
            .iter()
            .map(|(&date, &value)| TimeSeriesPoint::new(date, value, series_id))
            .collect();
        TimeSeries::new(series_id, points)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationRecord {
    date: String,
    value: String,
    series_id: String,
}

/// Repository loaded from a long-format CSV file.
///
/// Expected header: `date,value,series_id` (extra columns such as
/// `series_name` are ignored). Values that do not parse as numbers, like the
/// `.` placeholder for missing observations, are dropped.
#[derive(Debug, Clone)]
pub struct CsvSeriesRepository {
    inner: InMemorySeriesRepository,
}

impl CsvSeriesRepository {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let repo = Self::from_reader(file)?;
        info!(
            "Loaded {} series from {}",
            repo.inner.series.len(),
            path.as_ref().display()
        );
        Ok(repo)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut inner = InMemorySeriesRepository::new();
        let mut dropped = 0usize;

        for record in csv_reader.deserialize() {
            let record: ObservationRecord = record?;
            let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").map_err(|e| {
                AnalysisError::DataError(format!("Invalid date '{}': {}", record.date, e))
            })?;
            inner.register(record.series_id.clone());
            match record.value.parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    inner.upsert(TimeSeriesPoint::new(date, value, record.series_id))
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!("Dropped {} non-numeric observations", dropped);
        }
        Ok(Self { inner })
    }
}

impl SeriesRepository for CsvSeriesRepository {
    fn series_ids(&self) -> Result<Vec<String>> {
        self.inner.series_ids()
    }

    fn get_series(&self, series_id: &str) -> Result<TimeSeries> {
        self.inner.get_series(series_id)
    }
}

/// Wraps a repository and retries transient failures with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryingRepository<R> {
    inner: R,
    config: RetryConfig,
}

impl<R: SeriesRepository> RetryingRepository<R> {
    pub fn new(inner: R, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn execute_with_retry<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Fn(&R) -> Result<T>,
    {
        let mut attempt = 0;
        let mut delay = self.config.base_delay();

        loop {
            attempt += 1;

            match call(&self.inner) {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt >= self.config.max_attempts {
                        error!("{} failed after {} attempts: {}", operation, attempt, e);
                        return Err(e);
                    }

                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        operation, attempt, self.config.max_attempts, e
                    );

                    thread::sleep(delay);
                    delay = std::cmp::min(
                        delay.mul_f64(self.config.backoff_multiplier),
                        self.config.max_delay(),
                    );
                }
            }
        }
    }
}

impl<R: SeriesRepository> SeriesRepository for RetryingRepository<R> {
    fn series_ids(&self) -> Result<Vec<String>> {
        self.execute_with_retry("series_ids", |r| r.series_ids())
    }

    fn get_series(&self, series_id: &str) -> Result<TimeSeries> {
        self.execute_with_retry("get_series", |r| r.get_series(series_id))
    }

    fn get_all_series_panel(&self) -> Result<SeriesPanel> {
        self.execute_with_retry("get_all_series_panel", |r| r.get_all_series_panel())
    }

    fn current_values(&self) -> Result<BTreeMap<String, CurrentObservation>> {
        self.execute_with_retry("current_values", |r| r.current_values())
    }
}
