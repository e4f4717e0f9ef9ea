//! On-demand statistics over the stored incidents.

use crate::store::StoreState;
use crate::triage::Severity;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeverityBreakdown {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityBreakdown {
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStats {
    pub total: usize,
    pub last24h: usize,
    pub last7d: usize,
    #[serde(rename = "suspiciousIPs")]
    pub suspicious_ips: usize,
    pub blocked_fingerprints: usize,
    pub severity_breakdown: SeverityBreakdown,
    pub top_types: Vec<TypeCount>,
}

/// Aggregate the store into a stats report. Ties in the top-types list
/// keep the insertion order of each type's first occurrence.
pub fn compute(state: &StoreState, now: DateTime<Utc>) -> IncidentStats {
    let day_ago = now - Duration::hours(24);
    let week_ago = now - Duration::days(7);

    let mut breakdown = SeverityBreakdown::default();
    let mut last24h = 0;
    let mut last7d = 0;
    let mut type_counts: Vec<TypeCount> = Vec::new();

    for incident in state.incidents() {
        match incident.severity {
            Severity::Low => breakdown.low += 1,
            Severity::Medium => breakdown.medium += 1,
            Severity::High => breakdown.high += 1,
            Severity::Critical => breakdown.critical += 1,
        }
        if incident.timestamp >= day_ago {
            last24h += 1;
        }
        if incident.timestamp >= week_ago {
            last7d += 1;
        }
        let key = incident.kind.as_str();
        match type_counts.iter_mut().find(|t| t.kind == key) {
            Some(entry) => entry.count += 1,
            None => type_counts.push(TypeCount {
                kind: key.to_string(),
                count: 1,
            }),
        }
    }

    // Stable sort keeps first-occurrence order for equal counts.
    type_counts.sort_by(|a, b| b.count.cmp(&a.count));
    type_counts.truncate(5);

    IncidentStats {
        total: state.total(),
        last24h,
        last7d,
        suspicious_ips: state.suspicious_ip_count(),
        blocked_fingerprints: state.blocked_fingerprint_count(),
        severity_breakdown: breakdown,
        top_types: type_counts,
    }
}
