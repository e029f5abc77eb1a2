//! Artifact bundles and their storage
//!
//! Bundles are written as JSON tagged with a `schema_version`, so a reader
//! can refuse or migrate formats it does not know. Fields added later carry
//! `#[serde(default)]` and older files still load.

use crate::anomaly::AnomalyReport;
use crate::correlation::CorrelationResult;
use crate::ensemble::EnsembleForecast;
use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

/// Everything one analysis run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    #[serde(default)]
    pub forecasts: BTreeMap<String, EnsembleForecast>,
    #[serde(default)]
    pub anomalies: BTreeMap<String, AnomalyReport>,
    #[serde(default)]
    pub correlations: Option<CorrelationResult>,
    pub saved_at: DateTime<Utc>,
}

impl ArtifactBundle {
    pub fn new(
        forecasts: BTreeMap<String, EnsembleForecast>,
        anomalies: BTreeMap<String, AnomalyReport>,
        correlations: Option<CorrelationResult>,
    ) -> Self {
        Self {
            forecasts,
            anomalies,
            correlations,
            saved_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), BTreeMap::new(), None)
    }

    /// Forecast of one series or `MissingArtifact`
    pub fn forecast(&self, series_id: &str) -> Result<&EnsembleForecast> {
        self.forecasts
            .get(series_id)
            .ok_or_else(|| AnalysisError::MissingArtifact(format!("forecast for {}", series_id)))
    }

    /// Anomaly report of one series or `MissingArtifact`
    pub fn anomaly_report(&self, series_id: &str) -> Result<&AnomalyReport> {
        self.anomalies
            .get(series_id)
            .ok_or_else(|| AnalysisError::MissingArtifact(format!("anomaly report for {}", series_id)))
    }

    /// Correlation results or `MissingArtifact`
    pub fn correlation_result(&self) -> Result<&CorrelationResult> {
        self.correlations
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingArtifact("correlation results".to_string()))
    }
}

/// On-disk envelope
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "schema_version")]
enum StoredBundle {
    #[serde(rename = "1")]
    V1(ArtifactBundle),
}

/// Encode a bundle in the current schema
pub fn encode_bundle(bundle: &ArtifactBundle) -> Result<String> {
    Ok(serde_json::to_string_pretty(&StoredBundle::V1(bundle.clone()))?)
}

/// Decode a bundle of any known schema version
pub fn decode_bundle(json: &str) -> Result<ArtifactBundle> {
    match serde_json::from_str(json)? {
        StoredBundle::V1(bundle) => Ok(bundle),
    }
}

/// Blob store for artifact bundles
pub trait ArtifactStore: Send + Sync {
    fn save(&self, bundle: &ArtifactBundle) -> Result<()>;

    /// Latest saved bundle, `MissingArtifact` if nothing was saved
    fn load(&self) -> Result<ArtifactBundle>;
}

/// Stores the bundle as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactStore for JsonFileStore {
    fn save(&self, bundle: &ArtifactBundle) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, encode_bundle(bundle)?)?;
        info!(
            "Saved bundle with {} forecasts and {} anomaly reports to {}",
            bundle.forecasts.len(),
            bundle.anomalies.len(),
            self.path.display()
        );
        Ok(())
    }

    fn load(&self) -> Result<ArtifactBundle> {
        if !self.path.exists() {
            return Err(AnalysisError::MissingArtifact(format!(
                "no bundle at {}",
                self.path.display()
            )));
        }
        let bundle = decode_bundle(&fs::read_to_string(&self.path)?)?;
        info!("Loaded bundle saved at {} from {}", bundle.saved_at, self.path.display());
        Ok(bundle)
    }
}

/// Keeps the encoded bundle in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    encoded: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryStore {
    fn save(&self, bundle: &ArtifactBundle) -> Result<()> {
        let encoded = encode_bundle(bundle)?;
        let mut slot = self
            .encoded
            .write()
            .map_err(|_| AnalysisError::DataError("Artifact store lock poisoned".to_string()))?;
        *slot = Some(encoded);
        Ok(())
    }

    fn load(&self) -> Result<ArtifactBundle> {
        let slot = self
            .encoded
            .read()
            .map_err(|_| AnalysisError::DataError("Artifact store lock poisoned".to_string()))?;
        match slot.as_deref() {
            Some(json) => decode_bundle(json),
            None => Err(AnalysisError::MissingArtifact("no bundle saved".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sample_bundle() -> ArtifactBundle {
        let mut anomalies = BTreeMap::new();
        anomalies.insert(
            "UNRATE".to_string(),
            AnomalyReport {
                series_id: "UNRATE".to_string(),
                observations: vec![crate::anomaly::AnomalyObservation {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    value: 3.7,
                    is_anomaly: true,
                    score: -0.71,
                }],
                contamination: 0.1,
                threshold: -0.6,
            },
        );
        ArtifactBundle::new(BTreeMap::new(), anomalies, None)
    }

    #[test]
    fn test_encoding_is_version_tagged() {
        let json = encode_bundle(&sample_bundle()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schema_version"], "1");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let json = r#"{"schema_version":"99","saved_at":"2024-01-01T00:00:00Z"}"#;
        assert!(matches!(
            decode_bundle(json),
            Err(AnalysisError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_optional_sections_default() {
        let json = r#"{"schema_version":"1","saved_at":"2024-01-01T00:00:00Z"}"#;
        let bundle = decode_bundle(json).unwrap();
        assert!(bundle.forecasts.is_empty());
        assert!(matches!(
            bundle.correlation_result(),
            Err(AnalysisError::MissingArtifact(_))
        ));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("bundle.json"));
        assert!(matches!(store.load(), Err(AnalysisError::MissingArtifact(_))));

        let bundle = sample_bundle();
        store.save(&bundle).unwrap();
        assert_eq!(store.load().unwrap(), bundle);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().is_err());
        store.save(&sample_bundle()).unwrap();
        assert_eq!(store.load().unwrap().anomalies.len(), 1);
    }
}
