//! Threshold rule evaluation.
//!
//! Both functions are pure and total: an absent or non-positive baseline
//! makes a percent-change rule unsatisfiable instead of failing.

use crate::models::ThresholdRule;

/// Absolute change of `price` relative to `baseline`, in percent.
///
/// `None` when there is no usable baseline.
pub fn percent_change(price: f64, baseline: Option<f64>) -> Option<f64> {
    let base = baseline.filter(|b| *b > 0.0)?;
    Some(((price - base) / base * 100.0).abs())
}

pub fn evaluate(rule: &ThresholdRule, price: f64, baseline: Option<f64>) -> bool {
    match *rule {
        ThresholdRule::Above { value } => price >= value,
        ThresholdRule::Below { value } => price <= value,
        ThresholdRule::PercentChange { value } => {
            percent_change(price, baseline).is_some_and(|pct| pct >= value)
        }
    }
}

/// Human-readable justification stored in the hit and used in the notification body.
pub fn explain(rule: &ThresholdRule, price: f64, baseline: Option<f64>) -> String {
    match *rule {
        ThresholdRule::Above { value } => format!("price {price} >= threshold {value}"),
        ThresholdRule::Below { value } => format!("price {price} <= threshold {value}"),
        ThresholdRule::PercentChange { value } => {
            let pct = percent_change(price, baseline).unwrap_or(0.0);
            match baseline {
                Some(base) => format!("change {pct:.2}% from baseline {base} >= threshold {value}%"),
                None => format!("change {pct:.2}% (no baseline) >= threshold {value}%"),
            }
        }
    }
}
