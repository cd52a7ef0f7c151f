//! Thread identifiers and entry points

use core::fmt;

/// Body of a round-robin thread. Threads run forever.
pub type ThreadBody = fn() -> !;

/// Callback invoked from the tick handler at a fixed tick interval.
///
/// Must return promptly and must not spin on a semaphore.
pub type PeriodicCallback = fn();

/// Index of a thread slot in the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u8);

impl ThreadId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ThreadId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "T{}", self.0);
    }
}

/// Address at which a thread starts executing on its first restore.
///
/// On a Thumb target function addresses carry bit 0 set. An exception
/// return must not load a PC with bit 0 set, so the initial frame stores
/// [`resume_address`](Self::resume_address) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(u32);

impl EntryPoint {
    pub const fn new(address: u32) -> Self {
        Self(address)
    }

    /// Entry point of a thread body.
    ///
    /// Addresses are 32 bits wide on the target; host builds keep the low
    /// word, which is only meaningful for diagnostics.
    pub fn from_body(body: ThreadBody) -> Self {
        Self(body as usize as u32)
    }

    pub const fn address(self) -> u32 {
        self.0
    }

    /// Address with the Thumb bit cleared, as stacked in the PC slot
    pub const fn resume_address(self) -> u32 {
        self.0 & !1
    }
}

impl From<ThreadBody> for EntryPoint {
    fn from(body: ThreadBody) -> Self {
        Self::from_body(body)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EntryPoint {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=u32:#x}", self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    #[test]
    fn entry_point_keeps_address() {
        let entry = EntryPoint::new(0x0000_1235);
        assert_eq!(entry.address(), 0x0000_1235);
        assert_eq!(entry.to_string(), "0x00001235");
    }

    #[test]
    fn resume_address_drops_thumb_bit() {
        assert_eq!(EntryPoint::new(0x0800_0101).resume_address(), 0x0800_0100);
        assert_eq!(EntryPoint::new(0x0800_0100).resume_address(), 0x0800_0100);
    }

    #[test]
    fn entry_point_from_body() {
        let body: ThreadBody = idle;
        let entry = EntryPoint::from(body);
        assert_eq!(entry.address(), body as usize as u32);
    }

    #[test]
    fn thread_id_display() {
        assert_eq!(ThreadId(1).to_string(), "T1");
        assert_eq!(ThreadId(1).index(), 1);
    }
}
