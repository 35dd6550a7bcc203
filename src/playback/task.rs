/// A tick callback that re-arms itself after every run.
///
/// The host fires at most one pending tick per render tick. Arming or
/// cancelling bumps the generation, so a tick that started under an older
/// generation cannot re-arm once the task was cancelled.
#[derive(Debug, Default)]
pub struct RepeatingTask {
    generation: u64,
    pending: bool,
}

impl RepeatingTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run of the task; returns its generation
    pub fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.pending = true;
        self.generation
    }

    /// Drop any pending tick and invalidate the current generation
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    /// Consume the pending tick, returning the generation it belongs to
    pub fn fire(&mut self) -> Option<u64> {
        if std::mem::replace(&mut self.pending, false) {
            Some(self.generation)
        } else {
            None
        }
    }

    /// Schedule the next tick, unless the task was cancelled or re-armed
    /// since `generation` fired
    pub fn rearm(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
