//! Shared application state for all routes. Immutable after startup.

use crate::expression::Evaluator;
use crate::querykit::QueryClient;
use crate::response::Renderer;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn QueryClient>,
    pub evaluator: Arc<dyn Evaluator>,
    pub renderer: Arc<dyn Renderer>,
    /// Upper bound on one backend round trip.
    pub query_timeout: Duration,
}
