//! Single-slot mailbox
//!
//! One producer, one consumer, no queue. A send that finds the previous
//! value still unread overwrites it and counts one lost message, so the
//! sender never blocks. That makes `send` safe to call from the periodic
//! tick callback.

use core::cell::Cell;

use critical_section::Mutex;

use crate::sem::Semaphore;

pub struct Mailbox<T> {
    mail: Mutex<Cell<T>>,
    ready: Semaphore,
    lost: Mutex<Cell<u32>>,
}

impl<T: Copy> Mailbox<T> {
    /// Empty mailbox whose slot holds `initial` until the first send
    pub const fn new(initial: T) -> Self {
        Self {
            mail: Mutex::new(Cell::new(initial)),
            ready: Semaphore::new(0),
            lost: Mutex::new(Cell::new(0)),
        }
    }

    /// Empties the mailbox and clears the loss counter
    pub fn init(&self, initial: T) {
        critical_section::with(|cs| {
            self.mail.borrow(cs).set(initial);
            self.ready.set_in(cs, 0);
            self.lost.borrow(cs).set(0);
        });
    }

    /// Stores `data`, replacing any unread value.
    pub fn send(&self, data: T) {
        critical_section::with(|cs| {
            self.mail.borrow(cs).set(data);
            if self.ready.count_in(cs) != 0 {
                let lost = self.lost.borrow(cs);
                lost.set(lost.get().saturating_add(1));
            } else {
                self.ready.signal_in(cs);
            }
        });
    }

    /// Spins until a value is available and takes it.
    ///
    /// Thread context only.
    pub fn recv(&self) -> T {
        loop {
            if let Some(data) = self.try_recv() {
                return data;
            }
            core::hint::spin_loop();
        }
    }

    /// Takes the pending value, if any
    pub fn try_recv(&self) -> Option<T> {
        critical_section::with(|cs| {
            if self.ready.try_wait_in(cs) {
                Some(self.mail.borrow(cs).get())
            } else {
                None
            }
        })
    }

    pub fn has_mail(&self) -> bool {
        self.ready.count() > 0
    }

    /// Sends that overwrote an unread value
    pub fn lost(&self) -> u32 {
        critical_section::with(|cs| self.lost.borrow(cs).get())
    }
}
