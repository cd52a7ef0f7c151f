//! Tick-driven periodic callback slot

use ringos_core::PeriodicCallback;

#[derive(Debug, Clone, Copy)]
pub(crate) struct PeriodicSlot {
    callback: Option<PeriodicCallback>,
    period: u32,
    counter: u32,
}

impl PeriodicSlot {
    pub(crate) const fn new() -> Self {
        Self {
            callback: None,
            period: 0,
            counter: 0,
        }
    }

    /// Replaces any earlier registration and restarts the count
    pub(crate) fn install(&mut self, callback: PeriodicCallback, period: u32) {
        self.callback = Some(callback);
        self.period = period;
        self.counter = 0;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.callback.is_some()
    }

    /// Counts one tick and returns the callback when it is due.
    pub(crate) fn advance(&mut self) -> Option<PeriodicCallback> {
        let callback = self.callback?;
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            Some(callback)
        } else {
            None
        }
    }
}
