use parking_lot::Mutex;
use solace_core::OutboundSink;
use solace_protocol::ServerEvent;

/// Outbound sink that records every delivered event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ServerEvent>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of delivered events, in delivery order.
    pub fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().clone()
    }

    /// Drain delivered events.
    pub fn take(&self) -> Vec<ServerEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl OutboundSink for RecordingSink {
    fn send(&self, event: ServerEvent) {
        self.events.lock().push(event);
    }
}
