use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use trawl_core::{OutboundSegment, ReplyTransport, TransportError};

/// Records delivered segments; can be told to fail after N sends.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutboundSegment>>>,
    fail_after: Option<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(sends: usize) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_after: Some(sends),
        }
    }

    pub fn sent(&self) -> Vec<OutboundSegment> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ReplyTransport for RecordingTransport {
    async fn send(&self, segment: OutboundSegment) -> Result<(), TransportError> {
        let mut sent = self.sent.lock();
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(TransportError::Send("transport closed".to_string()));
        }
        sent.push(segment);
        Ok(())
    }
}
