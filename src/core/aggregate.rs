//! Aggregate metrics
//!
//! Summary counts and percentages are always derived from the full
//! collection, never from the visible page.

use crate::resource::Record;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Which records a metric counts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Every record
    Any,
    Equals { field: String, value: String },
    OneOf { field: String, values: Vec<String> },
    /// Timestamp field falls in the current calendar month
    SameMonth { field: String },
}

impl Predicate {
    pub fn matches(&self, record: &Record, now: DateTime<Utc>) -> bool {
        match self {
            Self::Any => true,
            Self::Equals { field, value } => {
                field_text(record, field).is_some_and(|v| v == *value)
            }
            Self::OneOf { field, values } => {
                field_text(record, field).is_some_and(|v| values.contains(&v))
            }
            Self::SameMonth { field } => record
                .field_value(field)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
                .is_some_and(|t| t.year() == now.year() && t.month() == now.month()),
        }
    }
}

fn field_text(record: &Record, field: &str) -> Option<String> {
    match record.field_value(field) {
        None | Some(Value::Null) => None,
        Some(_) => Some(record.field(field)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Count,
    Percentage,
}

/// Metric card definition from the resource registry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub label: String,
    pub predicate: Predicate,
    #[serde(default)]
    pub reduction: Reduction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricValue {
    pub count: usize,
    pub total: usize,
    pub reduction: Reduction,
}

impl MetricValue {
    /// count / total as a percentage; `None` for an empty collection
    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.count as f64 * 100.0 / self.total as f64)
        }
    }

    pub fn display(&self) -> String {
        match self.reduction {
            Reduction::Count => self.count.to_string(),
            Reduction::Percentage => self.percentage_display(),
        }
    }

    /// One decimal place, or "N/A"
    pub fn percentage_display(&self) -> String {
        match self.percentage() {
            Some(pct) => format!("{:.1}%", pct),
            None => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub label: String,
    pub value: MetricValue,
}

/// Metrics in registry order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics(Vec<Metric>);

impl Metrics {
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.0.iter().find(|m| m.name == name).map(|m| &m.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compute metrics against a fixed clock
pub fn aggregate_at(records: &[Record], specs: &[MetricSpec], now: DateTime<Utc>) -> Metrics {
    let total = records.len();
    Metrics(
        specs
            .iter()
            .map(|spec| Metric {
                name: spec.name.clone(),
                label: spec.label.clone(),
                value: MetricValue {
                    count: records
                        .iter()
                        .filter(|r| spec.predicate.matches(r, now))
                        .count(),
                    total,
                    reduction: spec.reduction,
                },
            })
            .collect(),
    )
}

pub fn aggregate(records: &[Record], specs: &[MetricSpec]) -> Metrics {
    aggregate_at(records, specs, Utc::now())
}
