#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # ringos port
//!
//! The platform boundary of the kernel. Everything that touches processor
//! state lives here:
//!
//! - [`frame`] builds the initial saved-register image of a thread and can
//!   pop a frame in software for tests and diagnostics.
//! - [`Port`] is the trait the kernel calls to mask interrupts, set up the
//!   clock and tick timer, request a switch and jump into the first thread.
//! - [`armv7m`] (feature `cortex-m`, ARM targets) implements it on
//!   ARMv7-M and provides the SysTick and PendSV traps that perform the
//!   switch.
//! - [`sim`] (feature `std`) records port calls on the host.

pub mod frame;

#[cfg(all(feature = "cortex-m", target_arch = "arm"))]
pub mod armv7m;

#[cfg(any(test, feature = "std"))]
pub mod sim;

pub use frame::{build_initial_frame, restore_frame, RegisterFile, SavedContext, FRAME_WORDS};

use ringos_core::TimeSlice;

/// Processor services the kernel depends on.
///
/// The port owns the trap handlers that save a thread's frame, call into the
/// kernel and restore the frame at the stack pointer it returns: the tick
/// trap calls `ringos_switch_context(sp) -> sp`, the yield trap raised by
/// [`request_switch`](Port::request_switch) calls
/// `ringos_yield_context(sp) -> sp`.
pub trait Port {
    /// Masks interrupts; they stay masked until the first thread starts.
    fn disable_interrupts(&self);

    /// Brings the core clock to its operating frequency.
    fn init_clock(&self);

    /// Stops, reprograms and re-arms the periodic tick timer.
    ///
    /// `priority` is the raw byte for the system handler priority register.
    fn configure_tick(&self, slice: TimeSlice, priority: u8);

    /// Asks for a yield at the next opportunity. The yield switches threads
    /// without counting a scheduler tick.
    fn request_switch(&self);

    /// Restores the frame at `stack_pointer` in thread mode with interrupts
    /// enabled. Never returns.
    ///
    /// # Safety
    ///
    /// `stack_pointer` must be the address of a frame written by
    /// [`build_initial_frame`] in a stack that lives for the rest of the
    /// program, and no thread may be running yet.
    unsafe fn start_first_thread(&self, stack_pointer: usize) -> !;
}
