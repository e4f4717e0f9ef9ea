//! Admin notification sinks -- fire-and-forget, never block ingestion.

use crate::evidence::EvidencePackage;
use crate::triage::{SecurityIncident, ThreatResponse};
use anyhow::Result;
use async_trait::async_trait;

/// Out-of-band delivery for admin alerts and evidence packages.
/// Implementations are best-effort: a failed delivery is logged by the
/// caller and never affects the triage outcome.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_admins(
        &self,
        incident: &SecurityIncident,
        response: &ThreatResponse,
    ) -> Result<()>;

    async fn deliver_evidence(&self, package: &EvidencePackage) -> Result<()>;
}

/// Default sink: structured log lines only.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify_admins(
        &self,
        incident: &SecurityIncident,
        response: &ThreatResponse,
    ) -> Result<()> {
        tracing::warn!(
            incident_id = %incident.id,
            kind = incident.kind.as_str(),
            severity = ?incident.severity,
            action = ?response.action,
            score = response.severity_score,
            "admin notification"
        );
        Ok(())
    }

    async fn deliver_evidence(&self, package: &EvidencePackage) -> Result<()> {
        tracing::warn!(
            incident_id = %package.incident.id,
            related = package.related.len(),
            "evidence package generated"
        );
        Ok(())
    }
}

/// Posts alerts and evidence packages to a chat/ops webhook as JSON.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify_admins(
        &self,
        incident: &SecurityIncident,
        response: &ThreatResponse,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "event": "admin_alert",
            "incident": incident,
            "response": response,
        });
        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn deliver_evidence(&self, package: &EvidencePackage) -> Result<()> {
        let payload = serde_json::json!({
            "event": "evidence_package",
            "package": package,
        });
        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
