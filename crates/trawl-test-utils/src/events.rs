use parking_lot::Mutex;
use std::sync::Arc;
use trawl_protocol::{EventMsg, EventPayload, EventSink};

/// Keeps every emitted event for later assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectingEventSink {
    events: Arc<Mutex<Vec<EventMsg>>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventMsg> {
        self.events.lock().clone()
    }

    pub fn payloads(&self) -> Vec<EventPayload> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: EventMsg) {
        self.events.lock().push(event);
    }
}
