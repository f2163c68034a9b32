//! Aggregation of raw insight records into a bounded, ordered report
//!
//! Records are grouped by binary (first-seen order), projected into presentation
//! rows, flattened, stably sorted and cut to the requested size. With a base
//! version the order is "largest response regression first"; without one it is
//! "slowest mean response first".

use serde::Serialize;
use std::collections::HashMap;

use crate::common::constants::UNKNOWN_BINARY;
use crate::insights::errors::InsightsError;
use crate::insights::structs::{DiffSummary, InsightRecord, InsightsBatch};

/// Performance dimension tracked per function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    Response,
    Throughput,
    Bottleneck,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Response, Metric::Throughput, Metric::Bottleneck];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Response => "Response",
            Metric::Throughput => "Throughput",
            Metric::Bottleneck => "Bottleneck",
        }
    }
}

/// Target mean, base mean and percentage change of one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricDelta {
    pub mean: Option<f64>,
    pub base_mean: Option<f64>,
    pub perc: Option<f64>,
}

/// Metric columns of a row; the variant follows whether a base version was compared
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowMetrics {
    Single {
        response: Option<f64>,
        throughput: Option<f64>,
        bottleneck: Option<f64>,
    },
    Compared {
        response: MetricDelta,
        throughput: MetricDelta,
        bottleneck: MetricDelta,
    },
}

/// Presentation projection of one insight record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub binary_name: String,
    pub function_name: String,
    pub metrics: RowMetrics,
}

impl AggregatedRow {
    fn project(binary_name: &str, record: &InsightRecord, has_baseline: bool) -> Self {
        let metrics = if has_baseline {
            RowMetrics::Compared {
                response: MetricDelta {
                    mean: record.mean_response,
                    base_mean: record.mean_response_base,
                    perc: record.perc_response,
                },
                throughput: MetricDelta {
                    mean: record.mean_throughput,
                    base_mean: record.mean_throughput_base,
                    perc: record.perc_throughput,
                },
                bottleneck: MetricDelta {
                    mean: record.mean_bottleneck,
                    base_mean: record.mean_bottleneck_base,
                    perc: record.perc_bottleneck,
                },
            }
        } else {
            RowMetrics::Single {
                response: record.mean_response,
                throughput: record.mean_throughput,
                bottleneck: record.mean_bottleneck,
            }
        };

        Self {
            binary_name: binary_name.to_string(),
            function_name: record.function_name.clone().unwrap_or_default(),
            metrics,
        }
    }

    pub fn is_compared(&self) -> bool {
        matches!(self.metrics, RowMetrics::Compared { .. })
    }

    pub fn mean(&self, metric: Metric) -> Option<f64> {
        match &self.metrics {
            RowMetrics::Single {
                response,
                throughput,
                bottleneck,
            } => match metric {
                Metric::Response => *response,
                Metric::Throughput => *throughput,
                Metric::Bottleneck => *bottleneck,
            },
            RowMetrics::Compared { .. } => self.delta(metric).and_then(|d| d.mean),
        }
    }

    pub fn base_mean(&self, metric: Metric) -> Option<f64> {
        self.delta(metric).and_then(|d| d.base_mean)
    }

    pub fn perc(&self, metric: Metric) -> Option<f64> {
        self.delta(metric).and_then(|d| d.perc)
    }

    fn delta(&self, metric: Metric) -> Option<&MetricDelta> {
        match &self.metrics {
            RowMetrics::Single { .. } => None,
            RowMetrics::Compared {
                response,
                throughput,
                bottleneck,
            } => Some(match metric {
                Metric::Response => response,
                Metric::Throughput => throughput,
                Metric::Bottleneck => bottleneck,
            }),
        }
    }

    /// Ordering key: response percentage for compared rows, mean response otherwise.
    /// Missing and non-finite values count as zero.
    pub fn sort_key(&self) -> f64 {
        let key = if self.is_compared() {
            self.perc(Metric::Response)
        } else {
            self.mean(Metric::Response)
        };
        // adding 0.0 folds -0.0 into 0.0
        key.filter(|v| v.is_finite()).unwrap_or(0.0) + 0.0
    }
}

/// Bounded report handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsReport {
    pub rows: Vec<AggregatedRow>,
    pub diff_summary: Option<DiffSummary>,
    pub has_baseline: bool,
    /// Number of records in the input batch
    pub total_count: usize,
    pub top_n: usize,
}

impl InsightsReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Group, project, order and truncate insight records.
///
/// Returns at most `top_n` rows; `top_n == 0` always yields an empty report.
pub fn aggregate(records: &[InsightRecord], has_baseline: bool, top_n: usize) -> Vec<AggregatedRow> {
    let mut group_index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&InsightRecord>)> = Vec::new();

    for record in records {
        let key = record.binary_name.as_deref().unwrap_or(UNKNOWN_BINARY);
        match group_index.get(key) {
            Some(&slot) => groups[slot].1.push(record),
            None => {
                group_index.insert(key, groups.len());
                groups.push((key, vec![record]));
            }
        }
    }

    let mut rows: Vec<AggregatedRow> = groups
        .iter()
        .flat_map(|(binary, items)| {
            items
                .iter()
                .map(move |record| AggregatedRow::project(binary, record, has_baseline))
        })
        .collect();

    // stable: ties keep grouped insertion order
    rows.sort_by(|a, b| b.sort_key().total_cmp(&a.sort_key()));
    rows.truncate(top_n);
    rows
}

/// Aggregate a fetched batch, surfacing its diff summary unchanged
pub fn aggregate_batch(batch: &InsightsBatch, has_baseline: bool, top_n: usize) -> InsightsReport {
    InsightsReport {
        rows: aggregate(&batch.insights, has_baseline, top_n),
        diff_summary: batch.diff_summary,
        has_baseline,
        total_count: batch.insights.len(),
        top_n,
    }
}

/// Aggregate an untyped record list, rejecting anything that is not an array of objects
pub fn aggregate_value(
    records: &serde_json::Value,
    has_baseline: bool,
    top_n: usize,
) -> Result<Vec<AggregatedRow>, InsightsError> {
    let batch = InsightsBatch::from_value(serde_json::json!({ "insights": records.clone() }))?;
    Ok(aggregate(&batch.insights, has_baseline, top_n))
}
