//! Tick counting and time-slice types

use core::fmt;

use crate::{OsError, OsResult};

/// Scheduler tick counter (wraps on overflow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Tick(u32);

impl Tick {
    pub const ZERO: Self = Self(0);

    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Advance by one tick
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Ticks elapsed since an earlier reading, modulo wrap-around
    pub fn elapsed_since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick:{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Tick {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "tick:{}", self.0);
    }
}

/// Length of one scheduling quantum in core clock cycles.
///
/// The periodic timer counts down from a 24-bit reload value of
/// `cycles - 1`, so valid slices are `1..=2^24` cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSlice(u32);

impl TimeSlice {
    /// Largest reload value the timer accepts
    pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

    /// Longest representable slice
    pub const MAX: Self = Self(Self::MAX_RELOAD + 1);

    pub const fn new(cycles: u32) -> OsResult<Self> {
        if cycles == 0 || cycles > Self::MAX_RELOAD + 1 {
            Err(OsError::InvalidTimeSlice(cycles))
        } else {
            Ok(Self(cycles))
        }
    }

    /// Slice of `1/hz` seconds at the given core clock
    pub const fn from_rate(core_clock_hz: u32, hz: u32) -> OsResult<Self> {
        if hz == 0 {
            return Err(OsError::InvalidTimeSlice(0));
        }
        Self::new(core_clock_hz / hz)
    }

    pub const fn cycles(self) -> u32 {
        self.0
    }

    /// Value to program into the reload register
    pub const fn reload(self) -> u32 {
        self.0 - 1
    }
}

impl fmt::Display for TimeSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}cycles", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TimeSlice {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}cycles", self.0);
    }
}
