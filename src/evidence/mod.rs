//! Evidence package synthesis for legal-action escalations.

use crate::store::StoreState;
use crate::triage::SecurityIncident;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of a triggering incident plus every stored incident sharing
/// its IP or fingerprint, bundled for downstream legal/ops review.
/// Delivery is best-effort; the package is never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePackage {
    pub generated_at: DateTime<Utc>,
    pub incident: SecurityIncident,
    pub related: Vec<SecurityIncident>,
}

/// Build a package from the current store state. Called with the store
/// lock held so the snapshot is consistent with the triage pass that
/// triggered it.
pub fn build_package(state: &StoreState, incident: &SecurityIncident) -> EvidencePackage {
    EvidencePackage {
        generated_at: Utc::now(),
        incident: incident.clone(),
        related: state.related_to(incident),
    }
}
