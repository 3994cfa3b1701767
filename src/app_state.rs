use std::sync::Arc;

use crate::services::{
    parser::DocumentParser,
    pipeline::{IngestionPipeline, PipelineSettings},
    registry::JobRegistry,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub pipeline: IngestionPipeline,
}

impl AppState {
    pub fn new(parser: Arc<dyn DocumentParser>, settings: PipelineSettings) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let pipeline = IngestionPipeline::new(Arc::clone(&registry), parser, settings);
        Self { registry, pipeline }
    }
}
