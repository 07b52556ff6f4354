use crossbeam::queue::SegQueue;
use std::sync::Arc;

/// Events the engine raises toward the UI. These originate on the audio
/// thread, so they travel over a lock-free queue and are drained by the
/// sync layer on the UI side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The shared shutdown timer expired; every channel has been stopped.
    TimerFired,
}

/// Lock-free event queue for engine -> UI communication.
pub struct EngineEventQueue {
    queue: Arc<SegQueue<EngineEvent>>,
}

impl EngineEventQueue {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(SegQueue::new()),
        }
    }

    /// Handle for the side raising events (audio thread).
    pub fn sender(&self) -> EngineEventSender {
        EngineEventSender {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Drain all pending events in arrival order.
    pub fn drain<F>(&self, mut handle: F)
    where
        F: FnMut(EngineEvent),
    {
        while let Some(event) = self.queue.pop() {
            handle(event);
        }
    }
}

impl Default for EngineEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct EngineEventSender {
    queue: Arc<SegQueue<EngineEvent>>,
}

impl EngineEventSender {
    /// Non-blocking push; never fails.
    pub fn send(&self, event: EngineEvent) {
        self.queue.push(event);
    }
}
