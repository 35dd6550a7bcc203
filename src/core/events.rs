//! Typed event channels.
//!
//! Each lifecycle event the engine raises gets its own channel; a channel
//! holds any number of handlers and calls them in registration order.

/// A list of handlers for one event carrying a payload of type `T`
pub struct EventChannel<T> {
    handlers: Vec<Box<dyn FnMut(&T)>>,
}

impl<T> EventChannel<T> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a handler; handlers run in the order they were added
    pub fn on<F>(&mut self, handler: F)
    where
        F: FnMut(&T) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn emit(&mut self, payload: &T) {
        for handler in self.handlers.iter_mut() {
            handler(payload);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Lifecycle events raised by the playback engine
#[derive(Debug, Default)]
pub struct EngineEvents {
    /// The capture ring completed a lap; payload is its capacity
    pub max_frames: EventChannel<usize>,
    /// A capture was turned into the current recording; payload is its frame count
    pub recording_finished: EventChannel<usize>,
    /// A non-looping playback reached the end of the crop window
    pub playback_finished: EventChannel<()>,
    /// Loading a recording from a source failed
    pub load_failed: EventChannel<String>,
}
