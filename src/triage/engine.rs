//! Escalation engine -- turns a report into a stored incident plus a
//! threat response, applying the ordered rule cascade.

use crate::evidence::{self, EvidencePackage};
use crate::notify::NotificationSink;
use crate::store::IncidentStore;
use crate::triage::severity::assign_severity;
use crate::triage::{
    Action, IncidentReport, RequestContext, SecurityIncident, Severity, ThreatResponse,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Trailing window for same-fingerprint burst detection.
const BURST_WINDOW_MINUTES: i64 = 5;

/// Bursts above this many incidents per window trigger investigation.
const BURST_THRESHOLD: usize = 3;

pub struct TriageEngine {
    store: Arc<IncidentStore>,
    sink: Arc<dyn NotificationSink>,
}

/// What one ingestion produced: the stored incident and its response.
#[derive(Debug, Clone)]
pub struct TriageOutcome {
    pub incident: SecurityIncident,
    pub response: ThreatResponse,
}

impl TriageEngine {
    pub fn new(store: Arc<IncidentStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    /// Ingest a report: assign severity, store the incident, run the
    /// escalation rules, apply any automated action, and dispatch
    /// notifications. The store lock is held for the whole pass and
    /// released before any notification I/O.
    pub fn ingest(&self, report: IncidentReport, ctx: RequestContext) -> TriageOutcome {
        let severity = assign_severity(report.kind, &report.data);
        let incident = SecurityIncident {
            id: Uuid::new_v4(),
            kind: report.kind,
            timestamp: report.timestamp.unwrap_or_else(Utc::now),
            fingerprint: report.fingerprint,
            session_id: report.session_id,
            severity,
            data: report.data,
            ip_address: ctx.ip_address,
            user_agent: ctx.user_agent,
            url: ctx.url,
        };

        let (response, evidence) = {
            let mut state = self.store.lock();
            state.append(incident.clone());
            let response = Self::analyze(&mut state, &incident);
            let evidence = Self::apply_action(&mut state, &incident, &response);
            (response, evidence)
        };

        tracing::info!(
            incident_id = %incident.id,
            kind = incident.kind.as_str(),
            severity = ?incident.severity,
            action = ?response.action,
            automated = response.automated,
            "incident triaged"
        );

        self.dispatch(&incident, &response, evidence);
        TriageOutcome { incident, response }
    }

    // The four rules run in a fixed order and later rules overwrite the
    // action set by earlier ones; the cascade is deliberate and matched
    // by the integration tests.
    fn analyze(
        state: &mut crate::store::StoreState,
        incident: &SecurityIncident,
    ) -> ThreatResponse {
        // Rule 1: baseline from the assigned severity.
        let mut response = ThreatResponse {
            action: Action::Log,
            severity_score: incident.severity.weight(),
            automated: false,
            notify_admins: false,
        };

        // Rule 2: repeat offender by IP.
        if state.is_suspicious(&incident.ip_address) {
            response.severity_score += 2;
            response.action = Action::Block;
            response.automated = true;
        }

        // Rule 3: same-fingerprint burst. The count includes the current
        // incident, which is already appended, so the check stays atomic
        // under the store lock.
        let burst = state.burst_count(
            &incident.fingerprint,
            incident.timestamp,
            Duration::minutes(BURST_WINDOW_MINUTES),
        );
        if burst > BURST_THRESHOLD {
            response.severity_score += 3;
            response.action = Action::Investigate;
            response.notify_admins = true;
            state.mark_suspicious(&incident.ip_address);
        }

        // Rule 4: severity escalation.
        if incident.severity >= Severity::High {
            response.notify_admins = true;
            response.automated = true;
            if incident.severity == Severity::Critical {
                response.action = Action::LegalAction;
                state.block_fingerprint(&incident.fingerprint);
            }
        }

        response
    }

    fn apply_action(
        state: &mut crate::store::StoreState,
        incident: &SecurityIncident,
        response: &ThreatResponse,
    ) -> Option<EvidencePackage> {
        if !response.automated {
            return None;
        }
        match response.action {
            Action::Block => {
                state.mark_suspicious(&incident.ip_address);
                state.block_fingerprint(&incident.fingerprint);
                None
            }
            Action::LegalAction => Some(evidence::build_package(state, incident)),
            // Investigation is a marker for manual review; storage is the log.
            Action::Investigate | Action::Log => None,
        }
    }

    fn dispatch(
        &self,
        incident: &SecurityIncident,
        response: &ThreatResponse,
        evidence: Option<EvidencePackage>,
    ) {
        if response.notify_admins {
            let sink = Arc::clone(&self.sink);
            let incident = incident.clone();
            let response = response.clone();
            tokio::spawn(async move {
                if let Err(err) = sink.notify_admins(&incident, &response).await {
                    tracing::warn!(%err, incident_id = %incident.id, "admin notification failed");
                }
            });
        }
        if let Some(package) = evidence {
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                if let Err(err) = sink.deliver_evidence(&package).await {
                    tracing::warn!(%err, incident_id = %package.incident.id, "evidence delivery failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogSink;
    use crate::store::DEFAULT_RETENTION;
    use crate::triage::IncidentType;
    use serde_json::json;

    fn engine() -> (TriageEngine, Arc<IncidentStore>) {
        let store = Arc::new(IncidentStore::new(DEFAULT_RETENTION));
        let engine = TriageEngine::new(Arc::clone(&store), Arc::new(LogSink));
        (engine, store)
    }

    fn report(kind: IncidentType, fingerprint: &str, data: serde_json::Value) -> IncidentReport {
        IncidentReport {
            kind,
            timestamp: None,
            fingerprint: fingerprint.to_string(),
            session_id: "s1".to_string(),
            data,
        }
    }

    fn ctx(ip: &str) -> RequestContext {
        RequestContext {
            ip_address: ip.to_string(),
            user_agent: "test-agent".to_string(),
            url: "https://app.example/rewards".to_string(),
        }
    }

    #[tokio::test]
    async fn baseline_low_severity_incident_just_logs() {
        let (engine, _store) = engine();
        let outcome = engine.ingest(
            report(IncidentType::SuspiciousActivity, "f1", json!({})),
            ctx("1.1.1.1"),
        );
        assert_eq!(outcome.incident.severity, Severity::Low);
        assert_eq!(
            outcome.response,
            ThreatResponse {
                action: Action::Log,
                severity_score: 1,
                automated: false,
                notify_admins: false,
            }
        );
    }

    #[tokio::test]
    async fn fourth_incident_in_burst_triggers_investigation() {
        let (engine, store) = engine();
        for _ in 0..3 {
            let outcome = engine.ingest(
                report(IncidentType::SuspiciousActivity, "f1", json!({})),
                ctx("1.1.1.1"),
            );
            assert_eq!(outcome.response.action, Action::Log);
        }
        let outcome = engine.ingest(
            report(IncidentType::SuspiciousActivity, "f1", json!({})),
            ctx("1.1.1.1"),
        );
        assert_eq!(outcome.response.action, Action::Investigate);
        assert!(outcome.response.notify_admins);
        // burst boost on top of the low baseline
        assert_eq!(outcome.response.severity_score, 1 + 3);
        assert!(store.lock().is_suspicious("1.1.1.1"));
    }

    #[tokio::test]
    async fn suspicious_ip_gets_blocked_automatically() {
        let (engine, store) = engine();
        store.lock().mark_suspicious("6.6.6.6");
        let outcome = engine.ingest(
            report(IncidentType::SuspiciousActivity, "f9", json!({})),
            ctx("6.6.6.6"),
        );
        assert_eq!(outcome.response.action, Action::Block);
        assert!(outcome.response.automated);
        assert_eq!(outcome.response.severity_score, 1 + 2);
        // automated block also blocks the fingerprint
        assert!(store.lock().is_blocked("f9"));
    }

    #[tokio::test]
    async fn critical_incident_escalates_to_legal_action() {
        let (engine, store) = engine();
        let outcome = engine.ingest(
            report(IncidentType::IntegrityViolation, "f-crit", json!({})),
            ctx("2.2.2.2"),
        );
        assert_eq!(outcome.incident.severity, Severity::Critical);
        assert_eq!(outcome.response.action, Action::LegalAction);
        assert!(outcome.response.automated);
        assert!(outcome.response.notify_admins);
        assert!(store.lock().is_blocked("f-crit"));
    }

    #[tokio::test]
    async fn high_severity_notifies_without_changing_action() {
        let (engine, store) = engine();
        let outcome = engine.ingest(
            report(IncidentType::UnauthorizedAccess, "f2", json!({})),
            ctx("3.3.3.3"),
        );
        assert_eq!(outcome.response.action, Action::Log);
        assert!(outcome.response.notify_admins);
        assert!(outcome.response.automated);
        assert!(!store.lock().is_blocked("f2"));
    }

    #[tokio::test]
    async fn burst_rule_overrides_block_from_suspicious_ip() {
        let (engine, _store) = engine();
        // Build a burst first; the 4th incident marks the IP suspicious.
        for _ in 0..4 {
            engine.ingest(
                report(IncidentType::SuspiciousActivity, "f1", json!({})),
                ctx("1.1.1.1"),
            );
        }
        // 5th: rule 2 sets block, rule 3 overwrites with investigate.
        let outcome = engine.ingest(
            report(IncidentType::SuspiciousActivity, "f1", json!({})),
            ctx("1.1.1.1"),
        );
        assert_eq!(outcome.response.action, Action::Investigate);
        // both boosts apply on top of the baseline
        assert_eq!(outcome.response.severity_score, 1 + 2 + 3);
    }

    #[tokio::test]
    async fn caller_supplied_timestamp_is_stored() {
        let (engine, _store) = engine();
        let ts = Utc::now() - Duration::minutes(30);
        let mut r = report(IncidentType::ScrapingAttempt, "f1", json!({}));
        r.timestamp = Some(ts);
        let outcome = engine.ingest(r, ctx("1.1.1.1"));
        assert_eq!(outcome.incident.timestamp, ts);
    }

    #[tokio::test]
    async fn incidents_outside_window_do_not_count_toward_burst() {
        let (engine, _store) = engine();
        for n in 0..4 {
            let mut r = report(IncidentType::SuspiciousActivity, "f1", json!({}));
            // Spread 20 minutes apart so no trailing 5-minute window holds 4.
            r.timestamp = Some(Utc::now() - Duration::minutes(60 - n * 20));
            let outcome = engine.ingest(r, ctx("1.1.1.1"));
            assert_eq!(outcome.response.action, Action::Log);
        }
    }
}
