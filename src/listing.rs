//! Text rendering of the policy list for CLI output.

use crate::model::PolicyListItem;
use serde_json::Value;
use std::collections::BTreeMap;
use time::macros::format_description;
use time::OffsetDateTime;

const NAME_W: usize = 24;
const STATUS_W: usize = 12;
const MODE_W: usize = 10;

/// Truncate to `width` chars, marking the cut with an ellipsis.
pub(crate) fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub(crate) fn format_time(t: OffsetDateTime) -> String {
    t.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "-".into())
}

/// Pre-formatted table lines, one per policy, in the given order.
pub(crate) fn build_listing(
    policies: &[&PolicyListItem],
    updated: Option<OffsetDateTime>,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(policies.len() + 2);
    lines.push(format!(
        "{:<NAME_W$} {:<STATUS_W$} {:<MODE_W$} {}",
        "NAME", "STATUS", "MODE", "DESCRIPTION"
    ));
    for p in policies {
        lines.push(
            format!(
                "{:<NAME_W$} {:<STATUS_W$} {:<MODE_W$} {}",
                fit(&p.name, NAME_W),
                fit(p.status.as_str(), STATUS_W),
                fit(p.last_execution_mode.as_deref().unwrap_or("-"), MODE_W),
                p.description
            )
            .trim_end()
            .to_string(),
        );
    }
    let when = updated.map(format_time).unwrap_or_else(|| "-".into());
    lines.push(format!("{} policies, updated {}", policies.len(), when));
    lines
}

/// Human-readable `key: value` lines for the policy detail view.
pub(crate) fn build_detail(values: &BTreeMap<&'static str, Value>) -> Vec<String> {
    const ORDER: [(&str, &str); 6] = [
        ("policyName", "Name"),
        ("policyDescription", "Description"),
        ("status", "Status"),
        ("statusInfo", "Status info"),
        ("submissionId", "Submission"),
        ("deployMode", "Deploy mode"),
    ];
    let mut lines: Vec<String> = ORDER
        .iter()
        .map(|(key, label)| format!("{label}: {}", scalar(values.get(key))))
        .collect();

    if let Some(Value::Object(err)) = values.get("error") {
        lines.push(format!("Error: {}", scalar(err.get("message"))));
        for (key, label) in [("phase", "  Phase"), ("originalMsg", "  Cause"), ("date", "  Date")] {
            if let Some(v) = err.get(key).filter(|v| !v.is_null()) {
                lines.push(format!("{label}: {}", scalar(Some(v))));
            }
        }
    }
    lines
}

pub(crate) fn scalar(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => "-".into(),
        Some(Value::String(s)) if s.is_empty() => "-".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
