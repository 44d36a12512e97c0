use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use trawl_core::{Responder, ResponderError, ResponseRequest};

/// Fixed text responder that records every request.
#[derive(Debug, Clone)]
pub struct RecordingResponder {
    text: String,
    requests: Arc<Mutex<Vec<ResponseRequest>>>,
}

impl RecordingResponder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ResponseRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn respond(&self, request: &ResponseRequest) -> Result<String, ResponderError> {
        self.requests.lock().push(request.clone());
        Ok(self.text.clone())
    }
}

/// Always fails, forcing the template fallback.
#[derive(Debug, Clone, Default)]
pub struct FailingResponder;

#[async_trait]
impl Responder for FailingResponder {
    async fn respond(&self, _request: &ResponseRequest) -> Result<String, ResponderError> {
        Err(ResponderError::Failed("model offline".to_string()))
    }
}
