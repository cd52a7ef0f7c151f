//! Counting semaphores
//!
//! [`Semaphore`] is the spin-wait flavor: `wait` polls the counter with a
//! short critical section per attempt, leaving interrupts enabled between
//! attempts so the tick can preempt the spinning thread.
//!
//! [`BlockingSemaphore`] parks the waiting thread in the ring instead. The
//! scheduler skips it until a `signal` releases it.

use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};

use ringos_core::ThreadId;
use ringos_port::Port;

use crate::Kernel;

/// Spin-wait counting semaphore
pub struct Semaphore {
    count: Mutex<Cell<i32>>,
}

impl Semaphore {
    pub const fn new(initial: i32) -> Self {
        Self {
            count: Mutex::new(Cell::new(initial)),
        }
    }

    /// Resets the counter. Not meant for use while threads wait on it.
    pub fn init(&self, value: i32) {
        critical_section::with(|cs| self.count.borrow(cs).set(value));
    }

    /// Spins until the counter is positive, then decrements it.
    ///
    /// Must not be called from the tick callback: nothing can signal while
    /// the tick handler spins.
    pub fn wait(&self) {
        while !self.try_wait() {
            core::hint::spin_loop();
        }
    }

    /// Decrements the counter if it is positive
    pub fn try_wait(&self) -> bool {
        critical_section::with(|cs| self.try_wait_in(cs))
    }

    pub fn signal(&self) {
        critical_section::with(|cs| self.signal_in(cs));
    }

    pub fn count(&self) -> i32 {
        critical_section::with(|cs| self.count_in(cs))
    }

    pub(crate) fn try_wait_in(&self, cs: CriticalSection<'_>) -> bool {
        let count = self.count.borrow(cs);
        if count.get() > 0 {
            count.set(count.get() - 1);
            true
        } else {
            false
        }
    }

    pub(crate) fn signal_in(&self, cs: CriticalSection<'_>) {
        let count = self.count.borrow(cs);
        count.set(count.get().saturating_add(1));
    }

    pub(crate) fn count_in(&self, cs: CriticalSection<'_>) -> i32 {
        self.count.borrow(cs).get()
    }

    pub(crate) fn set_in(&self, cs: CriticalSection<'_>, value: i32) {
        self.count.borrow(cs).set(value);
    }
}

enum WaitOutcome {
    Acquired,
    Parked(ThreadId),
    Busy,
}

/// Counting semaphore that parks waiters in the thread ring.
///
/// The counter may go negative; its magnitude is then the number of parked
/// threads. Threads are identified to the ring by the semaphore's address,
/// so a blocking semaphore must not move while threads wait on it. Keeping
/// it in a `static` does that.
pub struct BlockingSemaphore {
    count: Mutex<Cell<i32>>,
}

impl BlockingSemaphore {
    pub const fn new(initial: i32) -> Self {
        Self {
            count: Mutex::new(Cell::new(initial)),
        }
    }

    pub fn count(&self) -> i32 {
        critical_section::with(|cs| self.count.borrow(cs).get())
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }

    /// Decrements the counter; when it drops below zero the running thread
    /// is parked and gives up the processor until a `signal` releases it.
    ///
    /// Before launch there is no thread to park, and `wait` spins like
    /// [`Semaphore::wait`] instead, leaving the counter untouched until it
    /// can take a unit.
    pub fn wait<P: Port, const N: usize, const W: usize>(&self, kernel: &Kernel<P, N, W>) {
        loop {
            let outcome = critical_section::with(|cs| {
                let count = self.count.borrow(cs);
                if !kernel.is_launched_in(cs) {
                    if count.get() > 0 {
                        count.set(count.get() - 1);
                        return WaitOutcome::Acquired;
                    }
                    return WaitOutcome::Busy;
                }
                count.set(count.get() - 1);
                if count.get() >= 0 {
                    return WaitOutcome::Acquired;
                }
                match kernel.block_current(cs, self.key()) {
                    Some(id) => WaitOutcome::Parked(id),
                    None => WaitOutcome::Acquired,
                }
            });
            match outcome {
                WaitOutcome::Acquired => return,
                WaitOutcome::Parked(id) => {
                    log::trace!("{} parked on {:#x}", id, self.key());
                    kernel.suspend(id);
                    return;
                }
                WaitOutcome::Busy => core::hint::spin_loop(),
            }
        }
    }

    /// Increments the counter and releases the first parked thread, if any,
    /// in run order after the caller.
    pub fn signal<P: Port, const N: usize, const W: usize>(&self, kernel: &Kernel<P, N, W>) {
        let released = critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get() + 1);
            if count.get() <= 0 {
                kernel.unblock_first(cs, self.key())
            } else {
                None
            }
        });
        if let Some(id) = released {
            log::trace!("{} released from {:#x}", id, self.key());
        }
    }
}
