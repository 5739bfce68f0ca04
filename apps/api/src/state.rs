use std::sync::Arc;

use crate::config::Config;
use crate::extractors::speech::SpeechSynthesizer;
use crate::llm_client::InferenceClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Connected before the listener is bound; every request reuses it.
    pub inference: InferenceClient,
    /// Pluggable speech backend. Default: GoogleTts.
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub config: Config,
}
