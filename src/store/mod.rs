//! In-memory threat state -- incident log plus the suspicious-IP and
//! blocked-fingerprint sets.
//!
//! All state lives in process memory and dies with it; there is no
//! persistence layer. A single mutex guards the whole store so one triage
//! pass (append, burst count, set mutations) runs as one critical section
//! and concurrent same-fingerprint bursts cannot be under-counted.

use crate::triage::SecurityIncident;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Default cap on retained incidents. Oldest entries fall off first.
pub const DEFAULT_RETENTION: usize = 10_000;

/// Number of incidents returned by read APIs.
pub const RECENT_LIMIT: usize = 50;

pub struct IncidentStore {
    state: Mutex<StoreState>,
}

pub struct StoreState {
    incidents: VecDeque<SecurityIncident>,
    suspicious_ips: HashSet<String>,
    blocked_fingerprints: HashSet<String>,
    retention: usize,
}

impl IncidentStore {
    pub fn new(retention: usize) -> Self {
        Self {
            state: Mutex::new(StoreState {
                incidents: VecDeque::new(),
                suspicious_ips: HashSet::new(),
                blocked_fingerprints: HashSet::new(),
                retention: retention.max(1),
            }),
        }
    }

    /// Take the store lock for one triage pass or read.
    pub fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A poisoned lock only means a panic mid-pass; the state itself
        // is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Most recent incidents, newest first, capped at [`RECENT_LIMIT`].
    pub fn recent(&self) -> Vec<SecurityIncident> {
        let state = self.lock();
        state
            .incidents
            .iter()
            .rev()
            .take(RECENT_LIMIT)
            .cloned()
            .collect()
    }
}

impl Default for IncidentStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl StoreState {
    /// Append an incident, evicting the oldest entry once the retention
    /// cap is reached.
    pub fn append(&mut self, incident: SecurityIncident) {
        if self.incidents.len() >= self.retention {
            self.incidents.pop_front();
        }
        self.incidents.push_back(incident);
    }

    /// Count stored incidents for `fingerprint` whose timestamp falls in
    /// the trailing `window` ending at `reference`, inclusive of any
    /// already-appended current incident.
    pub fn burst_count(
        &self,
        fingerprint: &str,
        reference: DateTime<Utc>,
        window: Duration,
    ) -> usize {
        let cutoff = reference - window;
        self.incidents
            .iter()
            .filter(|i| i.fingerprint == fingerprint && i.timestamp >= cutoff)
            .count()
    }

    pub fn mark_suspicious(&mut self, ip: &str) {
        self.suspicious_ips.insert(ip.to_string());
    }

    pub fn is_suspicious(&self, ip: &str) -> bool {
        self.suspicious_ips.contains(ip)
    }

    pub fn block_fingerprint(&mut self, fingerprint: &str) {
        self.blocked_fingerprints.insert(fingerprint.to_string());
    }

    pub fn is_blocked(&self, fingerprint: &str) -> bool {
        self.blocked_fingerprints.contains(fingerprint)
    }

    /// All stored incidents sharing an IP or fingerprint with `incident`,
    /// excluding the incident itself. Used for evidence packages.
    pub fn related_to(&self, incident: &SecurityIncident) -> Vec<SecurityIncident> {
        self.incidents
            .iter()
            .filter(|i| {
                i.id != incident.id
                    && (i.ip_address == incident.ip_address
                        || i.fingerprint == incident.fingerprint)
            })
            .cloned()
            .collect()
    }

    pub fn incidents(&self) -> impl Iterator<Item = &SecurityIncident> {
        self.incidents.iter()
    }

    pub fn total(&self) -> usize {
        self.incidents.len()
    }

    pub fn suspicious_ip_count(&self) -> usize {
        self.suspicious_ips.len()
    }

    pub fn blocked_fingerprint_count(&self) -> usize {
        self.blocked_fingerprints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::{IncidentType, Severity};
    use uuid::Uuid;

    fn incident(fingerprint: &str, ip: &str, offset_secs: i64) -> SecurityIncident {
        SecurityIncident {
            id: Uuid::new_v4(),
            kind: IncidentType::SuspiciousActivity,
            timestamp: Utc::now() + Duration::seconds(offset_secs),
            fingerprint: fingerprint.to_string(),
            session_id: "s1".to_string(),
            severity: Severity::Low,
            data: serde_json::json!({}),
            ip_address: ip.to_string(),
            user_agent: "test".to_string(),
            url: "/".to_string(),
        }
    }

    #[test]
    fn retention_cap_evicts_oldest() {
        let store = IncidentStore::new(3);
        let mut state = store.lock();
        for n in 0..5 {
            state.append(incident(&format!("f{n}"), "1.2.3.4", n));
        }
        assert_eq!(state.total(), 3);
        let oldest = state.incidents().next().unwrap();
        assert_eq!(oldest.fingerprint, "f2");
    }

    #[test]
    fn burst_count_respects_window_and_fingerprint() {
        let store = IncidentStore::default();
        let now = Utc::now();
        let mut state = store.lock();
        state.append(incident("f1", "1.1.1.1", -600)); // outside 5m window
        state.append(incident("f1", "1.1.1.1", -120));
        state.append(incident("f2", "1.1.1.1", -60)); // other fingerprint
        state.append(incident("f1", "1.1.1.1", 0));
        assert_eq!(state.burst_count("f1", now, Duration::minutes(5)), 2);
    }

    #[test]
    fn related_to_matches_ip_or_fingerprint() {
        let store = IncidentStore::default();
        let mut state = store.lock();
        let same_fp = incident("f1", "9.9.9.9", -10);
        let same_ip = incident("f2", "1.1.1.1", -5);
        let unrelated = incident("f3", "8.8.8.8", -1);
        state.append(same_fp.clone());
        state.append(same_ip.clone());
        state.append(unrelated);
        let current = incident("f1", "1.1.1.1", 0);
        state.append(current.clone());

        let related = state.related_to(&current);
        assert_eq!(related.len(), 2);
        assert!(related.iter().any(|i| i.id == same_fp.id));
        assert!(related.iter().any(|i| i.id == same_ip.id));
    }

    #[test]
    fn recent_returns_newest_first_capped_at_fifty() {
        let store = IncidentStore::default();
        {
            let mut state = store.lock();
            for n in 0..60 {
                state.append(incident(&format!("f{n}"), "1.2.3.4", n));
            }
        }
        let recent = store.recent();
        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(recent[0].fingerprint, "f59");
    }
}
