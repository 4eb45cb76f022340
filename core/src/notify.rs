//! Notification sinks: the injected capability through which workers
//! and the lifecycle manager talk to audio/UX collaborators.

use crate::event::SimEvent;
use std::sync::{mpsc, Arc, Mutex, PoisonError};

/// Receives discrete simulation events. Called from worker threads,
/// so implementations must be cheap and must never block for long.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: SimEvent);
}

/// Forwards events over a std channel. A dropped receiver is ignored.
pub struct ChannelSink {
    tx: mpsc::Sender<SimEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<SimEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: SimEvent) {
        if self.tx.send(event).is_err() {
            log::trace!("notification receiver dropped; event discarded");
        }
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SimEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count_where(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| pred(e))
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: SimEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Writes each event to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, event: SimEvent) {
        log::info!("event: {event:?}");
    }
}

/// Delivers every event to each inner sink, in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, event: SimEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.notify(event.clone());
            }
            last.notify(event);
        }
    }
}
