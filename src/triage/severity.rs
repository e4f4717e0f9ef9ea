//! Severity assignment -- evaluated once at ingestion, immutable afterward.

use crate::triage::{IncidentType, Severity};
use serde_json::Value;

/// Assign a severity to a freshly reported incident.
///
/// `suspicious_activity` is the only type whose severity depends on the
/// report payload: more than 100 rapid clicks reads as automation (high),
/// any truthy `botIndicators` value as probable scripting (medium).
pub fn assign_severity(kind: IncidentType, data: &Value) -> Severity {
    match kind {
        IncidentType::IntegrityViolation => Severity::Critical,
        IncidentType::UnauthorizedAccess => Severity::High,
        IncidentType::ScrapingAttempt => Severity::Medium,
        IncidentType::SuspiciousActivity => {
            let rapid_clicks = data
                .get("rapidClicks")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            if rapid_clicks > 100.0 {
                Severity::High
            } else if is_truthy(data.get("botIndicators")) {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
        IncidentType::Other => Severity::Medium,
    }
}

// Truthiness follows the reporting clients' JSON conventions: absent,
// null, false, 0, and "" are falsy; arrays and objects (even empty) are not.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
