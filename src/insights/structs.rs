use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::insights::errors::InsightsError;

/// Raw per-function record as delivered by the insights endpoint.
///
/// Metric fields accept numbers or numeric strings; anything else is treated as missing.
/// The `*_base` and `perc_*` fields are only populated when a base version was compared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    #[serde(default)]
    pub binary_name: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_metric")]
    pub mean_response: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub mean_throughput: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub mean_bottleneck: Option<f64>,

    #[serde(default, deserialize_with = "lenient_metric")]
    pub mean_response_base: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub mean_throughput_base: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub mean_bottleneck_base: Option<f64>,

    #[serde(default, deserialize_with = "lenient_metric")]
    pub perc_response: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub perc_throughput: Option<f64>,
    #[serde(default, deserialize_with = "lenient_metric")]
    pub perc_bottleneck: Option<f64>,
}

impl InsightRecord {
    pub fn new(binary_name: &str, function_name: &str) -> Self {
        Self {
            binary_name: Some(binary_name.to_string()),
            function_name: Some(function_name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_means(mut self, response: f64, throughput: f64, bottleneck: f64) -> Self {
        self.mean_response = Some(response);
        self.mean_throughput = Some(throughput);
        self.mean_bottleneck = Some(bottleneck);
        self
    }

    pub fn with_base_means(mut self, response: f64, throughput: f64, bottleneck: f64) -> Self {
        self.mean_response_base = Some(response);
        self.mean_throughput_base = Some(throughput);
        self.mean_bottleneck_base = Some(bottleneck);
        self
    }

    pub fn with_percentages(mut self, response: f64, throughput: f64, bottleneck: f64) -> Self {
        self.perc_response = Some(response);
        self.perc_throughput = Some(throughput);
        self.perc_bottleneck = Some(bottleneck);
        self
    }
}

/// Function change counters from a base/target comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    #[serde(default, deserialize_with = "lenient_count")]
    pub modified: u64,
    #[serde(default, rename = "new", alias = "added", deserialize_with = "lenient_count")]
    pub added: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub deleted: u64,
}

/// One answer from the insights endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsightsBatch {
    pub insights: Vec<InsightRecord>,
    pub diff_summary: Option<DiffSummary>,
}

impl InsightsBatch {
    pub fn new(insights: Vec<InsightRecord>) -> Self {
        Self {
            insights,
            diff_summary: None,
        }
    }

    pub fn with_diff_summary(mut self, diff_summary: DiffSummary) -> Self {
        self.diff_summary = Some(diff_summary);
        self
    }

    /// Validate and convert an insights payload.
    ///
    /// `insights` must be an array of objects. An absent, `null`, empty or
    /// unusable `diff_summary` yields no diff summary; only display depends on it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, InsightsError> {
        let serde_json::Value::Object(mut payload) = value else {
            return Err(InsightsError::MalformedInput("payload is not an object".to_string()));
        };

        let insights = match payload.remove("insights") {
            Some(serde_json::Value::Array(items)) => items,
            Some(other) => {
                return Err(InsightsError::MalformedInput(format!(
                    "expected an array of insights, got {}",
                    json_kind(&other)
                )))
            }
            None => return Err(InsightsError::MalformedInput("missing insights".to_string())),
        };

        let mut records = Vec::with_capacity(insights.len());
        for (index, item) in insights.into_iter().enumerate() {
            if !item.is_object() {
                return Err(InsightsError::MalformedInput(format!(
                    "insight #{} is {}, expected an object",
                    index,
                    json_kind(&item)
                )));
            }
            let record: InsightRecord = serde_json::from_value(item)
                .map_err(|e| InsightsError::MalformedInput(format!("insight #{}: {}", index, e)))?;
            records.push(record);
        }

        let diff_summary = match payload.remove("diff_summary") {
            Some(serde_json::Value::Object(map)) if !map.is_empty() => {
                match serde_json::from_value(serde_json::Value::Object(map)) {
                    Ok(diff) => Some(diff),
                    Err(e) => {
                        warn!("Ignoring unusable diff_summary: {}", e);
                        None
                    }
                }
            }
            Some(serde_json::Value::Null) | Some(serde_json::Value::Object(_)) | None => None,
            Some(other) => {
                warn!("Ignoring diff_summary of unexpected type: {}", json_kind(&other));
                None
            }
        };

        Ok(Self {
            insights: records,
            diff_summary,
        })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn lenient_metric<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(metric_from_value))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(value) => count_from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid counter {}", value))),
    }
}

/// Non-negative integral count from a number or numeric string (`3`, `"3"`, `3.0`)
pub fn count_from_value(value: &serde_json::Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    metric_from_value(value)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64)
        .map(|v| v as u64)
}

/// Numeric view of a metric value; empty strings and non-numeric values are missing
pub fn metric_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
