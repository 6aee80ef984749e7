use std::sync::Arc;

use crate::config::Config;
use crate::render::{DocumentExporter, ExportOptions};
use crate::session::store::SessionStore;
use crate::tuning::ResumeTuner;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    /// Pluggable tuning backend. Default: GeminiTuner.
    pub tuner: Arc<dyn ResumeTuner>,
    /// Pluggable PDF engine. Default: WkHtmlToPdfExporter.
    pub exporter: Arc<dyn DocumentExporter>,
    pub export_options: ExportOptions,
}
