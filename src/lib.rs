//! tripline -- in-memory security incident triage service.
//!
//! Ingests client security-event reports, assigns severities, runs an
//! ordered escalation rule set against recent history, and serves
//! authenticated statistics. All state is process memory; nothing
//! survives a restart.

pub mod api;
pub mod auth;
pub mod config;
pub mod evidence;
pub mod notify;
pub mod store;
pub mod triage;

use crate::api::state::AppState;
use crate::notify::{LogSink, NotificationSink, WebhookSink};
use crate::store::IncidentStore;
use crate::triage::engine::TriageEngine;
use anyhow::Result;
use std::sync::Arc;

/// Start the tripline daemon: wire the store, engine, and sink, then
/// serve the API.
pub async fn serve(config: config::Config) -> Result<()> {
    let store = Arc::new(IncidentStore::new(config.retention));

    let sink: Arc<dyn NotificationSink> = match &config.admin_webhook {
        Some(url) => {
            tracing::info!(%url, "admin notifications via webhook");
            Arc::new(WebhookSink::new(url.clone()))
        }
        None => Arc::new(LogSink),
    };

    let engine = Arc::new(TriageEngine::new(Arc::clone(&store), sink));

    let addr: std::net::SocketAddr = config.bind.parse()?;
    let state = AppState {
        config: Arc::new(config),
        store,
        engine,
    };
    let app = api::router(state);

    tracing::info!(%addr, "tripline listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
