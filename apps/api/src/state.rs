use std::sync::Arc;

use crate::config::Config;
use crate::dialogue::session::{AnalysisSettings, ArtifactSink, SessionRegistry};
use crate::dialogue::source::ProfileSource;
use crate::render::artifacts::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Live render artifacts, keyed by the view or session that owns them.
    pub artifacts: Arc<ArtifactStore>,
    /// Intake dialogues. Completed analyses render into `artifacts` through an `ArtifactSink`.
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: &Config, source: Arc<dyn ProfileSource>) -> Self {
        let artifacts = Arc::new(ArtifactStore::new(config.max_retained_artifacts));
        let sink = Arc::new(ArtifactSink::new(Arc::clone(&artifacts)));
        let sessions = Arc::new(SessionRegistry::new(
            source,
            sink,
            AnalysisSettings {
                delay: config.analysis_delay(),
                max_attempts: config.analysis_max_attempts,
            },
            config.max_retained_sessions,
        ));

        AppState {
            artifacts,
            sessions,
        }
    }
}
