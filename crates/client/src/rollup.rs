use serde::{Deserialize, Serialize};

use crate::{ClientError, ClientResult};

const SUPPORTED_METRICS: [&str; 5] = ["min", "max", "sum", "avg", "value_count"];

pub struct RollupAction;

impl RollupAction {
    pub const NAME: &'static str = "indices:admin/xpack/rollup";
}

/// Rollup parameters. The lifecycle step passes them through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupActionConfig {
    pub groups: RollupGroups,
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupGroups {
    pub date_histogram: DateHistogramGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<TermsGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateHistogramGroup {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramGroup {
    pub fields: Vec<String>,
    pub interval: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsGroup {
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub field: String,
    pub metrics: Vec<String>,
}

impl RollupActionConfig {
    /// Date histogram on `field` with a fixed interval, no other groups or metrics.
    pub fn fixed(field: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            groups: RollupGroups {
                date_histogram: DateHistogramGroup {
                    field: field.into(),
                    fixed_interval: Some(interval.into()),
                    calendar_interval: None,
                    time_zone: None,
                },
                histogram: None,
                terms: None,
            },
            metrics: Vec::new(),
        }
    }

    pub fn calendar(field: impl Into<String>, interval: impl Into<String>) -> Self {
        let mut cfg = Self::fixed(field, "");
        cfg.groups.date_histogram.fixed_interval = None;
        cfg.groups.date_histogram.calendar_interval = Some(interval.into());
        cfg
    }

    pub fn with_terms<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.groups.terms = Some(TermsGroup { fields: fields.into_iter().map(Into::into).collect() });
        self
    }

    pub fn with_histogram<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I, interval: u64) -> Self {
        self.groups.histogram = Some(HistogramGroup { fields: fields.into_iter().map(Into::into).collect(), interval });
        self
    }

    pub fn with_metric(mut self, field: impl Into<String>, metrics: &[&str]) -> Self {
        self.metrics.push(MetricConfig { field: field.into(), metrics: metrics.iter().map(|m| m.to_string()).collect() });
        self
    }

    pub fn validate(&self) -> ClientResult<()> {
        let dh = &self.groups.date_histogram;
        if dh.field.is_empty() {
            return Err(ClientError::Validation("date_histogram field is required".into()));
        }
        match (&dh.fixed_interval, &dh.calendar_interval) {
            (Some(i), None) | (None, Some(i)) if !i.is_empty() => {}
            _ => return Err(ClientError::Validation("exactly one of fixed_interval or calendar_interval is required".into())),
        }
        if let Some(h) = &self.groups.histogram {
            if h.fields.is_empty() || h.interval == 0 {
                return Err(ClientError::Validation("histogram needs fields and a positive interval".into()));
            }
        }
        if let Some(t) = &self.groups.terms {
            if t.fields.is_empty() {
                return Err(ClientError::Validation("terms group needs at least one field".into()));
            }
        }
        for m in &self.metrics {
            if m.field.is_empty() || m.metrics.is_empty() {
                return Err(ClientError::Validation(format!("metric config for [{}] needs a field and metrics", m.field)));
            }
            if let Some(bad) = m.metrics.iter().find(|name| !SUPPORTED_METRICS.contains(&name.as_str())) {
                return Err(ClientError::Validation(format!("unsupported metric [{}] on field [{}]", bad, m.field)));
            }
        }
        Ok(())
    }
}

/// Request to roll `source_index` up into `rollup_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupRequest {
    source_index: String,
    rollup_index: String,
    config: RollupActionConfig,
}

impl RollupRequest {
    pub fn new(source_index: impl Into<String>, rollup_index: impl Into<String>, config: RollupActionConfig) -> Self {
        Self { source_index: source_index.into(), rollup_index: rollup_index.into(), config }
    }

    pub fn source_index(&self) -> &str { &self.source_index }
    pub fn rollup_index(&self) -> &str { &self.rollup_index }
    pub fn config(&self) -> &RollupActionConfig { &self.config }

    pub fn validate(&self) -> ClientResult<()> {
        if self.source_index.is_empty() {
            return Err(ClientError::Validation("rollup source index is missing".into()));
        }
        if self.rollup_index.is_empty() {
            return Err(ClientError::Validation("rollup target index is missing".into()));
        }
        if self.source_index == self.rollup_index {
            return Err(ClientError::Validation(format!("rollup index [{}] must differ from its source", self.rollup_index)));
        }
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation() {
        let ok = RollupActionConfig::calendar("@timestamp", "1d")
            .with_terms(["host"])
            .with_histogram(["bytes"], 1024)
            .with_metric("cpu", &["min", "max", "avg"]);
        assert!(ok.validate().is_ok());

        let mut both = RollupActionConfig::fixed("@timestamp", "1h");
        both.groups.date_histogram.calendar_interval = Some("1d".into());
        assert!(both.validate().is_err());

        let empty_interval = RollupActionConfig::fixed("@timestamp", "");
        assert!(empty_interval.validate().is_err());

        let bad_metric = RollupActionConfig::fixed("@timestamp", "1h").with_metric("cpu", &["median"]);
        let err = bad_metric.validate().unwrap_err();
        assert_eq!(err, ClientError::Validation("unsupported metric [median] on field [cpu]".into()));

        let zero_hist = RollupActionConfig::fixed("@timestamp", "1h").with_histogram(["bytes"], 0);
        assert!(zero_hist.validate().is_err());
    }

    #[test]
    fn request_validation() {
        let cfg = RollupActionConfig::fixed("@timestamp", "1h");
        assert!(RollupRequest::new("idx1", "rollup-idx1", cfg.clone()).validate().is_ok());
        assert!(RollupRequest::new("", "rollup-idx1", cfg.clone()).validate().is_err());
        assert!(RollupRequest::new("idx1", "", cfg.clone()).validate().is_err());
        assert!(RollupRequest::new("idx1", "idx1", cfg).validate().is_err());
    }

    #[test]
    fn config_parses_from_json() {
        let cfg: RollupActionConfig = serde_json::from_str(
            r#"{
                "groups": { "date_histogram": { "field": "@timestamp", "fixed_interval": "1h", "time_zone": "UTC" } },
                "metrics": [ { "field": "bytes", "metrics": ["sum", "value_count"] } ]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.groups.date_histogram.time_zone.as_deref(), Some("UTC"));
        assert!(cfg.groups.terms.is_none());
        assert!(cfg.validate().is_ok());
    }
}
