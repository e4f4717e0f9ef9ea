use crate::config::Config;
use crate::store::IncidentStore;
use crate::triage::engine::TriageEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<IncidentStore>,
    pub engine: Arc<TriageEngine>,
}
