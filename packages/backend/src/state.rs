use std::sync::Arc;

use crate::services::vision::VisionClient;

#[derive(Clone)]
pub struct AppState {
    llm: Arc<VisionClient>,
}

impl AppState {
    pub fn new(llm: VisionClient) -> Self {
        Self { llm: Arc::new(llm) }
    }

    pub fn llm(&self) -> Arc<VisionClient> {
        Arc::clone(&self.llm)
    }
}
