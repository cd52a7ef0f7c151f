#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # ringos core
//!
//! Core types shared by the ringos kernel and its platform ports: the error
//! type, kernel configuration, thread identifiers and entry points, and the
//! tick/time-slice types used by the scheduler and the launch path.

use core::fmt;

pub mod config;
pub mod thread;
pub mod time;

pub use config::*;
pub use thread::*;
pub use time::*;

/// ringos version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default ring capacity: two cooperating foreground threads.
pub const N_MAX_THREADS: usize = 2;

/// Default size of each thread stack, in 32-bit words.
pub const STACK_WORDS: usize = 100;

/// Result type used throughout the kernel
pub type OsResult<T> = Result<T, OsError>;

/// Configuration and construction errors.
///
/// Runtime conditions such as a mailbox overwrite are not errors; they are
/// counted where they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsError {
    /// A kernel operation was issued before `init`.
    NotInitialized,
    /// Registration or launch with an empty thread ring.
    NoThreads,
    /// More thread entries than the static ring capacity.
    TooManyThreads { requested: usize, capacity: usize },
    /// Threads were already installed; slots are never removed.
    ThreadsAlreadyAdded,
    /// The kernel has already transferred control to the first thread.
    AlreadyLaunched,
    /// Periodic callbacks need a period of at least one tick.
    InvalidPeriod,
    /// Time slice does not fit the 24-bit reload register.
    InvalidTimeSlice(u32),
    /// A thread stack cannot hold one initial frame.
    StackTooSmall { words: usize, required: usize },
    /// A saved context does not point at a complete frame in its stack.
    InvalidContext,
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsError::NotInitialized => write!(f, "kernel is not initialized"),
            OsError::NoThreads => write!(f, "no threads registered"),
            OsError::TooManyThreads {
                requested,
                capacity,
            } => write!(
                f,
                "{requested} threads requested, ring capacity is {capacity}"
            ),
            OsError::ThreadsAlreadyAdded => write!(f, "threads already added"),
            OsError::AlreadyLaunched => write!(f, "kernel already launched"),
            OsError::InvalidPeriod => write!(f, "periodic callback period must be non-zero"),
            OsError::InvalidTimeSlice(cycles) => {
                write!(f, "time slice of {cycles} cycles exceeds the 24-bit timer")
            }
            OsError::StackTooSmall { words, required } => {
                write!(f, "stack of {words} words cannot hold a {required}-word frame")
            }
            OsError::InvalidContext => write!(f, "saved context outside of thread stack"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for OsError {}

#[cfg(feature = "defmt")]
impl defmt::Format for OsError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            OsError::NotInitialized => defmt::write!(fmt, "NotInitialized"),
            OsError::NoThreads => defmt::write!(fmt, "NoThreads"),
            OsError::TooManyThreads {
                requested,
                capacity,
            } => defmt::write!(fmt, "TooManyThreads({}/{})", requested, capacity),
            OsError::ThreadsAlreadyAdded => defmt::write!(fmt, "ThreadsAlreadyAdded"),
            OsError::AlreadyLaunched => defmt::write!(fmt, "AlreadyLaunched"),
            OsError::InvalidPeriod => defmt::write!(fmt, "InvalidPeriod"),
            OsError::InvalidTimeSlice(cycles) => defmt::write!(fmt, "InvalidTimeSlice({})", cycles),
            OsError::StackTooSmall { words, required } => {
                defmt::write!(fmt, "StackTooSmall({}/{})", words, required)
            }
            OsError::InvalidContext => defmt::write!(fmt, "InvalidContext"),
        }
    }
}
