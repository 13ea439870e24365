//! One-shot timers that report back through the server event queue
//!
//! A timer is a spawned task that sleeps and then enqueues
//! `ServerEvent::TimerFired`. It never touches race state itself; the event
//! loop applies the firing in order with every other event.

use crate::game::TimerId;
use crate::network::ServerEvent;
use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct TimerService {
    handles: HashMap<TimerId, JoinHandle<()>>,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl TimerService {
    pub fn new(events: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            handles: HashMap::new(),
            events,
        }
    }

    pub fn start(&mut self, timer: TimerId, after: Duration) {
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(ServerEvent::TimerFired { timer });
        });

        if let Some(previous) = self.handles.insert(timer, handle) {
            previous.abort();
        }
    }

    /// Aborts a pending timer. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, timer: TimerId) -> bool {
        match self.handles.remove(&timer) {
            Some(handle) => {
                handle.abort();
                debug!("Cancelled {}", timer);
                true
            }
            None => false,
        }
    }

    /// Forgets a timer whose firing has been received
    pub fn fired(&mut self, timer: TimerId) {
        self.handles.remove(&timer);
    }

    pub fn pending(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}
