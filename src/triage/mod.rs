//! Incident triage -- data model, severity assignment, escalation engine.

pub mod engine;
pub mod severity;
pub mod stats;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categories of security events reported by clients.
///
/// Unrecognized wire values collapse into `Other` so a new client-side
/// detector does not break ingestion; `Other` triages at medium severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    SuspiciousActivity,
    IntegrityViolation,
    UnauthorizedAccess,
    ScrapingAttempt,
    #[serde(other)]
    Other,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::SuspiciousActivity => "suspicious_activity",
            IncidentType::IntegrityViolation => "integrity_violation",
            IncidentType::UnauthorizedAccess => "unauthorized_access",
            IncidentType::ScrapingAttempt => "scraping_attempt",
            IncidentType::Other => "other",
        }
    }
}

/// Ordinal severity classification. Ordering matters: escalation rules
/// compare against `High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric weight used as the baseline severity score.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

/// Action decided by a triage pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Log,
    Block,
    Investigate,
    LegalAction,
}

/// A stored incident. `severity` is computed once at ingestion and never
/// re-evaluated afterward.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityIncident {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: IncidentType,
    pub timestamp: DateTime<Utc>,
    pub fingerprint: String,
    pub session_id: String,
    pub severity: Severity,
    pub data: serde_json::Value,
    pub ip_address: String,
    pub user_agent: String,
    pub url: String,
}

/// Outcome of one triage pass. Ephemeral, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatResponse {
    pub action: Action,
    pub severity_score: u32,
    pub automated: bool,
    pub notify_admins: bool,
}

/// Caller-supplied report body. `fingerprint` and `session_id` are
/// required; a report missing them is rejected before anything is stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    #[serde(rename = "type")]
    pub kind: IncidentType,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub fingerprint: String,
    pub session_id: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Request metadata captured at the HTTP boundary and stored verbatim.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: String,
    pub user_agent: String,
    pub url: String,
}
