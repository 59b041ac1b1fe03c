use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Threshold condition a monitor checks on every tick.
///
/// Serialized as `{"type": "above" | "below" | "percentChange", "value": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ThresholdRule {
    Above { value: f64 },
    Below { value: f64 },
    // absolute percent, e.g. 2.0 = 2%
    PercentChange { value: f64 },
}

impl ThresholdRule {
    /// Build a rule from its wire tag and threshold.
    pub fn from_parts(kind: &str, value: f64) -> Result<Self, MonitorError> {
        let rule = match kind {
            "above" => ThresholdRule::Above { value },
            "below" => ThresholdRule::Below { value },
            "percentChange" => ThresholdRule::PercentChange { value },
            other => {
                return Err(MonitorError::InvalidRule(format!(
                    "unsupported rule type '{other}', expected above/below/percentChange"
                )))
            }
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn value(&self) -> f64 {
        match *self {
            ThresholdRule::Above { value }
            | ThresholdRule::Below { value }
            | ThresholdRule::PercentChange { value } => value,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ThresholdRule::Above { .. } => "above",
            ThresholdRule::Below { .. } => "below",
            ThresholdRule::PercentChange { .. } => "percentChange",
        }
    }

    pub fn needs_baseline(&self) -> bool {
        matches!(self, ThresholdRule::PercentChange { .. })
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if !self.value().is_finite() {
            return Err(MonitorError::InvalidRule(format!(
                "{} threshold must be a finite number",
                self.kind()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Running,
    Triggered,
    Expired,
    Stopped,
}

impl MonitorStatus {
    pub fn is_running(self) -> bool {
        self == MonitorStatus::Running
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorHit {
    pub time: DateTime<Utc>,
    pub price: f64,
    pub reason: String,
}

/// Caller-visible view of a monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorTask {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub notify_target: String,
    pub ticker: String,
    pub rule: ThresholdRule,
    pub poll_interval_ms: u64,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: MonitorStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,

    // percentChange only; captured once at start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_price: Option<f64>,

    pub hits: Vec<MonitorHit>,
}

/// Parameters accepted by `MonitorManager::start`.
#[derive(Debug, Clone)]
pub struct StartMonitor {
    pub conversation_id: String,
    pub user_id: String,
    pub notify_target: String,
    pub ticker: String,
    pub rule: ThresholdRule,
    pub poll_interval_seconds: Option<f64>,
    pub duration_minutes: Option<f64>,
}
