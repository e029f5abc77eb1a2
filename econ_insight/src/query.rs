//! Deterministic question answering
//!
//! Questions are routed through [`ROUTING_RULES`], an ordered keyword table:
//! the first rule with a keyword that starts any word of the question wins.
//! Each category handler composes its answer only from the
//! [`KnowledgeBase`] and falls back to a fixed explanation when the facts it
//! needs are missing.

use crate::knowledge::{
    AnomalyInsight, CorrelationInsights, ForecastSummary, KnowledgeBase, TrendInsight,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Employment,
    Inflation,
    Forecast,
    Correlation,
    Anomaly,
    Trend,
    General,
}

/// Keywords that send a question to one category
#[derive(Debug, Clone, Copy)]
pub struct RoutingRule {
    pub category: QueryCategory,
    pub keywords: &'static [&'static str],
}

/// Evaluated top to bottom
pub const ROUTING_RULES: &[RoutingRule] = &[
    RoutingRule {
        category: QueryCategory::Employment,
        keywords: &["employment", "jobs", "payroll"],
    },
    RoutingRule {
        category: QueryCategory::Inflation,
        keywords: &["inflation", "cpi", "price", "cost"],
    },
    RoutingRule {
        category: QueryCategory::Forecast,
        keywords: &["forecast", "predict", "future", "next"],
    },
    RoutingRule {
        category: QueryCategory::Correlation,
        keywords: &["correlation", "correlated", "relationship", "connected"],
    },
    RoutingRule {
        category: QueryCategory::Anomaly,
        keywords: &["anomaly", "anomalies", "unusual", "outlier", "spike"],
    },
    RoutingRule {
        category: QueryCategory::Trend,
        keywords: &["trend", "direction", "change"],
    },
    // after the topical rules, so "unemployment trend" stays a trend question
    RoutingRule {
        category: QueryCategory::Employment,
        keywords: &["unemployment"],
    },
];

pub const SUGGESTED_QUESTIONS: [&str; 5] = [
    "What is the current employment situation?",
    "How is inflation trending?",
    "What are the 3-month forecasts?",
    "Which economic indicators are most correlated?",
    "Are there any unusual patterns in the data?",
];

const GENERAL_ANSWER: &str = "I can help you analyze employment, inflation, forecasts, \
correlations, anomalies, and trends in economic data. Try asking about specific topics like \
'What is the employment forecast?' or 'Are there any anomalies in inflation data?'";

/// Pairs quoted in a correlation answer
const CORRELATION_ANSWER_PAIRS: usize = 3;

/// Category of a question
pub fn classify(question: &str) -> QueryCategory {
    let lowered = question.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    ROUTING_RULES
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|k| words.iter().any(|w| w.starts_with(k)))
        })
        .map(|rule| rule.category)
        .unwrap_or(QueryCategory::General)
}

/// Structured payload accompanying an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AnswerDetails {
    Empty,
    Forecasts(BTreeMap<String, ForecastSummary>),
    Correlations(CorrelationInsights),
    Anomalies(BTreeMap<String, AnomalyInsight>),
    Trends(BTreeMap<String, TrendInsight>),
    Suggestions(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub category: QueryCategory,
    pub answer: String,
    /// Series ids the answer draws on
    pub data_sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, f64>>,
    pub details: AnswerDetails,
}

struct Answer {
    text: String,
    data_sources: Vec<String>,
    metrics: Option<BTreeMap<String, f64>>,
    details: AnswerDetails,
}

impl Answer {
    fn fallback(text: &str) -> Self {
        Self {
            text: text.to_string(),
            data_sources: Vec::new(),
            metrics: None,
            details: AnswerDetails::Empty,
        }
    }
}

/// Answers questions from one knowledge base snapshot
pub struct QueryEngine<'a> {
    knowledge: &'a KnowledgeBase,
}

impl<'a> QueryEngine<'a> {
    pub fn new(knowledge: &'a KnowledgeBase) -> Self {
        Self { knowledge }
    }

    pub fn answer(&self, question: &str) -> AnswerRecord {
        let category = classify(question);
        debug!("Routing {:?} to {:?}", question, category);

        let answer = match category {
            QueryCategory::Employment => self.employment(),
            QueryCategory::Inflation => self.inflation(),
            QueryCategory::Forecast => self.forecast(),
            QueryCategory::Correlation => self.correlation(),
            QueryCategory::Anomaly => self.anomaly(),
            QueryCategory::Trend => self.trend(),
            QueryCategory::General => Self::general(),
        };

        AnswerRecord {
            question: question.to_string(),
            category,
            answer: answer.text,
            data_sources: answer.data_sources,
            metrics: answer.metrics,
            details: answer.details,
        }
    }

    fn name(&self, series_id: &str) -> String {
        self.knowledge.catalog.display_name(series_id)
    }

    fn employment(&self) -> Answer {
        let context = &self.knowledge.economic_context.employment;
        let (Some(current), Some(change)) =
            (context.current_jobs_thousands, context.forecast_change_percent)
        else {
            return Answer::fallback("Employment data is not available in the current analysis.");
        };

        Answer {
            text: format!(
                "Current employment is at {} thousand jobs. The employment outlook is {} with a \
                 forecasted change of {:.2}% over the next 3 months.",
                format_thousands(current),
                context.outlook,
                change
            ),
            data_sources: vec![self.knowledge.catalog.roles.employment.clone()],
            metrics: Some(BTreeMap::from([
                ("current_jobs_thousands".to_string(), current),
                ("forecast_change_percent".to_string(), change),
            ])),
            details: AnswerDetails::Empty,
        }
    }

    fn inflation(&self) -> Answer {
        let context = &self.knowledge.economic_context.inflation;
        let (Some(cpi), Some(annual)) = (context.current_cpi, context.forecasted_inflation_annual)
        else {
            return Answer::fallback("Inflation data is not available in the current analysis.");
        };

        Answer {
            text: format!(
                "Current Consumer Price Index is {:.2}. The inflation outlook is {} with an \
                 annualized inflation rate forecast of {:.2}%.",
                cpi, context.outlook, annual
            ),
            data_sources: vec![self.knowledge.catalog.roles.inflation.clone()],
            metrics: Some(BTreeMap::from([
                ("current_cpi".to_string(), cpi),
                ("forecasted_inflation_annual".to_string(), annual),
            ])),
            details: AnswerDetails::Empty,
        }
    }

    fn forecast(&self) -> Answer {
        let forecasts = &self.knowledge.forecasts;
        let parts: Vec<String> = forecasts
            .iter()
            .filter_map(|(id, f)| {
                f.next_3_months
                    .first()
                    .map(|next| format!("{}: {:.2}", self.name(id), next))
            })
            .collect();
        if parts.is_empty() {
            return Answer::fallback("No forecasts are available. Run an analysis first.");
        }

        Answer {
            text: format!("Here are the 3-month forecasts: {}", parts.join("; ")),
            data_sources: forecasts.keys().cloned().collect(),
            metrics: None,
            details: AnswerDetails::Forecasts(forecasts.clone()),
        }
    }

    fn correlation(&self) -> Answer {
        let Some(correlations) = self
            .knowledge
            .correlations
            .as_ref()
            .filter(|c| !c.strong.is_empty())
        else {
            return Answer::fallback(
                "No strong correlations were found between the analysed indicators.",
            );
        };

        let quoted = &correlations.strong[..correlations.strong.len().min(CORRELATION_ANSWER_PAIRS)];
        let parts: Vec<String> = quoted
            .iter()
            .map(|c| {
                format!(
                    "{} and {} ({:.3})",
                    self.name(&c.series_a),
                    self.name(&c.series_b),
                    c.correlation
                )
            })
            .collect();
        let sources: BTreeSet<String> = quoted
            .iter()
            .flat_map(|c| [c.series_a.clone(), c.series_b.clone()])
            .collect();

        Answer {
            text: format!("Strongest correlations found: {}", parts.join("; ")),
            data_sources: sources.into_iter().collect(),
            metrics: None,
            details: AnswerDetails::Correlations(correlations.clone()),
        }
    }

    fn anomaly(&self) -> Answer {
        let anomalies = &self.knowledge.anomalies;
        if anomalies.is_empty() {
            return Answer::fallback("No anomaly analysis is available. Run an analysis first.");
        }

        let parts: Vec<String> = anomalies
            .iter()
            .map(|(id, a)| {
                format!("{}: {:.1}% anomaly rate", self.name(id), a.anomaly_rate_percent)
            })
            .collect();

        Answer {
            text: format!("Anomaly detection results: {}", parts.join("; ")),
            data_sources: anomalies.keys().cloned().collect(),
            metrics: None,
            details: AnswerDetails::Anomalies(anomalies.clone()),
        }
    }

    fn trend(&self) -> Answer {
        let trends = &self.knowledge.trends;
        if trends.is_empty() {
            return Answer::fallback(
                "Trend analysis needs at least 12 observations per series and none are available.",
            );
        }

        let parts: Vec<String> = trends
            .iter()
            .map(|(id, t)| {
                format!(
                    "{}: {} ({:.1}% change)",
                    self.name(id),
                    t.direction,
                    t.magnitude_percent
                )
            })
            .collect();

        Answer {
            text: format!("Current trends: {}", parts.join("; ")),
            data_sources: trends.keys().cloned().collect(),
            metrics: None,
            details: AnswerDetails::Trends(trends.clone()),
        }
    }

    fn general() -> Answer {
        Answer {
            text: GENERAL_ANSWER.to_string(),
            data_sources: Vec::new(),
            metrics: None,
            details: AnswerDetails::Suggestions(
                SUGGESTED_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            ),
        }
    }
}

/// Rounds to a whole number and groups digits in threes
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
