//! Fan-out of orchestrator events to any number of listeners.

use crossbeam_channel::{Receiver, Sender};

use tessitura_types::Event;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<Event>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// New listener; receives every event emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<Event> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: Event) {
        log::debug!(target: "session::events", "{}", event.name());
        // Listeners that hung up are dropped.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
