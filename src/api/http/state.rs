use std::sync::Arc;

use crate::bulk::BulkPipeline;
use crate::engine::GraphEngine;

pub struct AppState<E: GraphEngine + 'static> {
    pub pipeline: Arc<BulkPipeline<E>>,
}

impl<E: GraphEngine + 'static> AppState<E> {
    pub fn new(pipeline: Arc<BulkPipeline<E>>) -> Self {
        Self { pipeline }
    }
}

impl<E: GraphEngine + 'static> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}
