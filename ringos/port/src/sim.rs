//! Host port
//!
//! Records every call the kernel makes so tests can check the bring-up
//! sequence. There is no processor to hand over to: starting the first
//! thread parks the calling host thread for good.

use std::sync::{Mutex, MutexGuard};

use ringos_core::TimeSlice;

use crate::Port;

/// One recorded port call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEvent {
    DisableInterrupts,
    InitClock,
    ConfigureTick { reload: u32, priority: u8 },
    RequestSwitch,
    StartFirstThread { stack_pointer: usize },
}

/// Port that logs calls instead of touching hardware
#[derive(Debug, Default)]
pub struct SimPort {
    events: Mutex<Vec<PortEvent>>,
}

impl SimPort {
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Calls recorded so far
    pub fn events(&self) -> Vec<PortEvent> {
        self.log().clone()
    }

    /// Returns and clears the recorded calls
    pub fn take_events(&self) -> Vec<PortEvent> {
        std::mem::take(&mut *self.log())
    }

    /// Number of switch requests recorded so far
    pub fn switch_requests(&self) -> usize {
        self.log()
            .iter()
            .filter(|event| matches!(event, PortEvent::RequestSwitch))
            .count()
    }

    fn record(&self, event: PortEvent) {
        log::trace!("sim port: {event:?}");
        self.log().push(event);
    }

    // A test that panicked mid-record leaves the log usable.
    fn log(&self) -> MutexGuard<'_, Vec<PortEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Port for SimPort {
    fn disable_interrupts(&self) {
        self.record(PortEvent::DisableInterrupts);
    }

    fn init_clock(&self) {
        self.record(PortEvent::InitClock);
    }

    fn configure_tick(&self, slice: TimeSlice, priority: u8) {
        self.record(PortEvent::ConfigureTick {
            reload: slice.reload(),
            priority,
        });
    }

    fn request_switch(&self) {
        self.record(PortEvent::RequestSwitch);
    }

    unsafe fn start_first_thread(&self, stack_pointer: usize) -> ! {
        self.record(PortEvent::StartFirstThread { stack_pointer });
        loop {
            std::thread::park();
        }
    }
}
