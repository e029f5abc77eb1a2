use approx::assert_relative_eq;
use chrono::{Months, NaiveDate};
use econ_analysis::correlation::{CorrelationMatrix, CorrelationPair, CorrelationResult};
use econ_analysis::{
    ArimaOrder, ArtifactBundle, EnsembleForecast, EnsembleWeights, ForecastStep,
    InMemorySeriesRepository, TimeSeries,
};
use econ_insight::interpret::{EmploymentContext, InflationContext};
use econ_insight::{
    classify, AnswerDetails, EconomicContext, EmploymentOutlook, InflationOutlook, KnowledgeBase,
    KnowledgeBaseBuilder, MetadataCatalog, QueryCategory, QueryEngine,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeMap;
use std::io::Write;

#[rstest]
#[case("What is the current employment situation?", QueryCategory::Employment)]
#[case("How many jobs were created?", QueryCategory::Employment)]
#[case("Show me payroll numbers", QueryCategory::Employment)]
#[case("How is inflation trending?", QueryCategory::Inflation)]
#[case("What does the CPI say?", QueryCategory::Inflation)]
#[case("Are prices rising?", QueryCategory::Inflation)]
#[case("What about the cost of living?", QueryCategory::Inflation)]
#[case("What are the 3-month forecasts?", QueryCategory::Forecast)]
#[case("Can you predict retail sales?", QueryCategory::Forecast)]
#[case("What happens next quarter?", QueryCategory::Forecast)]
#[case("What does the future hold?", QueryCategory::Forecast)]
#[case("Show the correlation matrix", QueryCategory::Correlation)]
#[case("Which economic indicators are most correlated?", QueryCategory::Correlation)]
#[case("Is there a relationship between income and spending?", QueryCategory::Correlation)]
#[case("Which series are connected?", QueryCategory::Correlation)]
#[case("Any anomaly in retail?", QueryCategory::Anomaly)]
#[case("Are there any unusual patterns in the data?", QueryCategory::Anomaly)]
#[case("Was there a spike last year?", QueryCategory::Anomaly)]
#[case("Show outliers", QueryCategory::Anomaly)]
#[case("What is the unemployment trend?", QueryCategory::Trend)]
#[case("What is the current unemployment rate?", QueryCategory::Employment)]
#[case("Is unemployment rising?", QueryCategory::Employment)]
#[case("Which direction is income heading?", QueryCategory::Trend)]
#[case("How did spending change?", QueryCategory::Trend)]
#[case("Hello there", QueryCategory::General)]
#[case("", QueryCategory::General)]
fn test_routing_table(#[case] question: &str, #[case] expected: QueryCategory) {
    assert_eq!(classify(question), expected);
}

#[test]
fn test_routing_is_case_insensitive() {
    assert_eq!(classify("INFLATION?"), QueryCategory::Inflation);
    assert_eq!(classify("Employment Forecast"), QueryCategory::Employment);
}

fn monthly(id: &str, values: &[f64]) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let pairs: Vec<(NaiveDate, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (start + Months::new(i as u32), *v))
        .collect();
    TimeSeries::from_pairs(id, &pairs).unwrap()
}

fn flat_forecast(series: &TimeSeries, next: f64) -> EnsembleForecast {
    let last = series.last().unwrap().date;
    let steps = (1..=6u32)
        .map(|k| ForecastStep {
            date: last + Months::new(k),
            point: next,
            lower: next - 1.0,
            upper: next + 1.0,
            trend_component: next,
            trend_lower: next - 1.0,
            trend_upper: next + 1.0,
            arima_component: next,
            arima_lower: next - 1.0,
            arima_upper: next + 1.0,
        })
        .collect();
    EnsembleForecast {
        series_id: series.series_id().to_string(),
        steps,
        arima_order: ArimaOrder::new(1, 1, 0),
        arima_aic: 10.0,
        weights: EnsembleWeights::default(),
        training_points: series.len(),
        order_search: Vec::new(),
    }
}

fn boundary_knowledge() -> KnowledgeBase {
    // payrolls fall 1000 -> 999, CPI rises 300 -> 301
    let mut payroll: Vec<f64> = (0..12).map(|i| 990.0 + i as f64).collect();
    *payroll.last_mut().unwrap() = 1000.0;
    let cpi: Vec<f64> = (0..12).map(|i| 289.0 + i as f64).collect();
    let payems = monthly("PAYEMS", &payroll);
    let cpiaucsl = monthly("CPIAUCSL", &cpi);

    let mut repository = InMemorySeriesRepository::new();
    repository.insert_series(&payems);
    repository.insert_series(&cpiaucsl);

    let correlations = CorrelationResult {
        matrix: CorrelationMatrix {
            series_ids: vec!["CPIAUCSL".to_string(), "PAYEMS".to_string()],
            values: vec![vec![Some(1.0), Some(0.95)], vec![Some(0.95), Some(1.0)]],
        },
        ranked: vec![CorrelationPair {
            series_a: "CPIAUCSL".to_string(),
            series_b: "PAYEMS".to_string(),
            correlation: 0.95,
            overlap: 12,
        }],
    };
    let bundle = ArtifactBundle::new(
        BTreeMap::from([
            ("PAYEMS".to_string(), flat_forecast(&payems, 999.0)),
            ("CPIAUCSL".to_string(), flat_forecast(&cpiaucsl, 301.0)),
        ]),
        BTreeMap::new(),
        Some(correlations),
    );

    KnowledgeBaseBuilder::new(MetadataCatalog::default(), &bundle)
        .build(&repository)
        .unwrap()
}

#[test]
fn test_boundary_outlooks_through_builder() {
    let knowledge = boundary_knowledge();
    let context = &knowledge.economic_context;

    assert_eq!(context.employment.outlook, EmploymentOutlook::Stable);
    assert_relative_eq!(
        context.employment.forecast_change_percent.unwrap(),
        -0.1,
        epsilon = 1e-12
    );
    assert_eq!(context.inflation.outlook, InflationOutlook::HighInflation);
    assert_relative_eq!(
        context.inflation.forecasted_inflation_annual.unwrap(),
        4.0,
        epsilon = 1e-12
    );
    assert_eq!(
        context.business_implications,
        vec!["High inflation may reduce consumer purchasing power".to_string()]
    );
}

#[test]
fn test_employment_and_inflation_answers() {
    let knowledge = boundary_knowledge();
    let engine = QueryEngine::new(&knowledge);

    let employment = engine.answer("What is the employment outlook?");
    assert_eq!(
        employment.answer,
        "Current employment is at 1,000 thousand jobs. The employment outlook is stable with \
         a forecasted change of -0.10% over the next 3 months."
    );
    assert_eq!(employment.data_sources, vec!["PAYEMS".to_string()]);
    let metrics = employment.metrics.unwrap();
    assert_relative_eq!(metrics["current_jobs_thousands"], 1000.0);

    let inflation = engine.answer("How is inflation?");
    assert_eq!(
        inflation.answer,
        "Current Consumer Price Index is 300.00. The inflation outlook is high_inflation with \
         an annualized inflation rate forecast of 4.00%."
    );
    assert!(inflation.metrics.unwrap().contains_key("forecasted_inflation_annual"));
}

#[test]
fn test_correlation_answer_names_series() {
    let knowledge = boundary_knowledge();
    let record = QueryEngine::new(&knowledge).answer("Show the correlation between series");
    assert_eq!(
        record.answer,
        "Strongest correlations found: Consumer Price Index and Total Nonfarm Payrolls (0.950)"
    );
    assert_eq!(
        record.data_sources,
        vec!["CPIAUCSL".to_string(), "PAYEMS".to_string()]
    );
    match record.details {
        AnswerDetails::Correlations(c) => {
            assert_eq!(c.strong.len(), 1);
            assert!(c.moderate.is_empty());
        }
        other => panic!("Expected correlation details, got {:?}", other),
    }
}

fn empty_knowledge() -> KnowledgeBase {
    KnowledgeBase {
        current_data: BTreeMap::new(),
        forecasts: BTreeMap::new(),
        trends: BTreeMap::new(),
        correlations: None,
        anomalies: BTreeMap::new(),
        economic_context: EconomicContext {
            employment: EmploymentContext::unknown(),
            inflation: InflationContext::unknown(),
            key_risks: Vec::new(),
            business_implications: Vec::new(),
        },
        catalog: MetadataCatalog::default(),
    }
}

#[rstest]
#[case("What is the employment outlook?", "Employment data is not available in the current analysis.")]
#[case("What is inflation doing?", "Inflation data is not available in the current analysis.")]
#[case("Give me a forecast", "No forecasts are available. Run an analysis first.")]
#[case("Any anomalies?", "No anomaly analysis is available. Run an analysis first.")]
#[case(
    "What is the trend?",
    "Trend analysis needs at least 12 observations per series and none are available."
)]
fn test_fallback_answers(#[case] question: &str, #[case] expected: &str) {
    let knowledge = empty_knowledge();
    let record = QueryEngine::new(&knowledge).answer(question);
    assert_eq!(record.answer, expected);
    assert!(record.data_sources.is_empty());
    assert!(record.metrics.is_none());
    assert_eq!(record.details, AnswerDetails::Empty);
}

#[test]
fn test_general_answer_suggests_questions() {
    let knowledge = empty_knowledge();
    let record = QueryEngine::new(&knowledge).answer("Hi");
    assert_eq!(record.category, QueryCategory::General);
    match record.details {
        AnswerDetails::Suggestions(s) => assert_eq!(s.len(), 5),
        other => panic!("Expected suggestions, got {:?}", other),
    }
}

#[test]
fn test_answer_record_json_shape() {
    let knowledge = empty_knowledge();
    let record = QueryEngine::new(&knowledge).answer("Any spike?");
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["category"], "anomaly");
    assert_eq!(json["details"]["kind"], "empty");
    assert!(json.get("metrics").is_none());
}

#[test]
fn test_catalog_file_renames_series() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[series.PAYEMS]
name = "Payrolls"
unit = "thousands"
category = "Labour"
description = "Nonfarm payrolls"
"#
    )
    .unwrap();
    let catalog = MetadataCatalog::from_file(file.path()).unwrap();
    assert_eq!(catalog.display_name("PAYEMS"), "Payrolls");
    assert_eq!(catalog.display_name("UNRATE"), "Unemployment Rate");
}
