//! Application state.

use std::sync::Arc;

use reelstack_worker::{Compositor, WorkerConfig, WorkerResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub compositor: Arc<Compositor>,
}

impl AppState {
    /// Create state backed by the production compositor.
    pub fn new(config: ApiConfig, worker_config: &WorkerConfig) -> WorkerResult<Self> {
        let compositor = Compositor::from_config(worker_config, None)?;
        Ok(Self::with_compositor(config, compositor))
    }

    pub fn with_compositor(config: ApiConfig, compositor: Compositor) -> Self {
        Self {
            config,
            compositor: Arc::new(compositor),
        }
    }
}
