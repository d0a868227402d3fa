//! Abstract event sink the device state machine reports transitions to.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PairingModeStarted,
    PairingModeEnded,
    ConnectionChanged { paired: bool },
    PairingChanged { paired: bool },
    KvRecordsAdded { count: usize },
    KvRecordsRemoved { count: usize },
    SigningRequestCreated { id: u64 },
    SigningRequestCompleted { id: u64, accepted: bool },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink that drops every event, for callers that don't care.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: Event) {}
}

/// Sink that forwards events to the `log` facade at debug level.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, event: Event) {
        log::debug!("device event: {event:?}");
    }
}
