use econ_analysis::error::AnalysisError;
use econ_math::MathError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    match AnalysisError::from(io_error) {
        AnalysisError::IoError(_) => {}
        other => panic!("Expected IoError variant, got {:?}", other),
    }

    let math_error = MathError::SingularMatrix("pivot 0".to_string());
    match AnalysisError::from(math_error) {
        AnalysisError::Math(MathError::SingularMatrix(_)) => {}
        other => panic!("Expected Math variant, got {:?}", other),
    }

    let json_error = serde_json::from_str::<f64>("not json").unwrap_err();
    assert!(matches!(
        AnalysisError::from(json_error),
        AnalysisError::Serialization(_)
    ));
}

#[test]
fn test_error_display() {
    let error = AnalysisError::InsufficientData {
        series_id: "UNRATE".to_string(),
        required: 24,
        actual: 10,
    };
    assert_eq!(
        error.to_string(),
        "Insufficient data for UNRATE: need at least 24 observations, have 10"
    );
    assert_eq!(
        AnalysisError::SeriesNotFound("GDP".to_string()).to_string(),
        "Series not found: GDP"
    );
    assert_eq!(AnalysisError::EmptyPanel.to_string(), "Panel contains no data");
}

#[test]
fn test_retryable_classification() {
    let transient = AnalysisError::Repository {
        message: "timeout".to_string(),
        retryable: true,
    };
    let permanent = AnalysisError::Repository {
        message: "permission denied".to_string(),
        retryable: false,
    };
    assert!(transient.is_retryable());
    assert!(!permanent.is_retryable());
    assert!(AnalysisError::from(io::Error::new(io::ErrorKind::Interrupted, "eintr")).is_retryable());
    assert!(!AnalysisError::ModelFitFailure("none".to_string()).is_retryable());
}

#[test]
fn test_series_local_classification() {
    assert!(AnalysisError::SeriesNotFound("X".to_string()).is_series_local());
    assert!(AnalysisError::EmptyResult("X".to_string()).is_series_local());
    assert!(AnalysisError::ModelFitFailure("X".to_string()).is_series_local());
    assert!(!AnalysisError::EmptyPanel.is_series_local());
    assert!(!AnalysisError::Repository {
        message: "down".to_string(),
        retryable: true
    }
    .is_series_local());
    assert!(!AnalysisError::Config("bad".to_string()).is_series_local());
}
