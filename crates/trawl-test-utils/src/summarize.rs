use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use trawl_crawl::{SummarizeError, Summarizer};

/// Returns the same synthesis every time and records its inputs.
#[derive(Debug, Clone)]
pub struct FixedSummarizer {
    synthesis: String,
    inputs: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FixedSummarizer {
    pub fn new(synthesis: impl Into<String>) -> Self {
        Self {
            synthesis: synthesis.into(),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Texts passed to each `summarize` call.
    pub fn inputs(&self) -> Vec<Vec<String>> {
        self.inputs.lock().clone()
    }
}

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, texts: &[String]) -> Result<String, SummarizeError> {
        self.inputs.lock().push(texts.to_vec());
        Ok(self.synthesis.clone())
    }
}

/// Always fails.
#[derive(Debug, Clone)]
pub struct FailingSummarizer {
    message: String,
}

impl FailingSummarizer {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _texts: &[String]) -> Result<String, SummarizeError> {
        Err(SummarizeError::Failed(self.message.clone()))
    }
}
