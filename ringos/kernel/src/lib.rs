#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # ringos
//!
//! A minimal preemptive kernel for Cortex-M4 parts: a fixed ring of
//! foreground threads switched round-robin from the SysTick interrupt, one
//! optional periodic callback driven by the same tick, spin-wait counting
//! semaphores, and a single-slot mailbox that counts overwritten values.
//!
//! ## Bring-up
//!
//! ```ignore
//! use ringos::{Mailbox, KERNEL};
//!
//! static SAMPLES: Mailbox<u32> = Mailbox::new(0);
//!
//! fn sample() { SAMPLES.send(read_adc()); }
//! fn consumer() -> ! { loop { process(SAMPLES.recv()); } }
//! fn display() -> ! { loop { refresh(); } }
//!
//! ringos::init(pll_init).unwrap();
//! ringos::add_threads(consumer, display).unwrap();
//! ringos::add_periodic_event_thread(sample, 1).unwrap();
//! ringos::launch(80_000); // 1 ms at 80 MHz
//! ```
//!
//! On the host (feature `std`) the same [`Kernel`] runs against
//! [`ringos_port::sim::SimPort`] and each call to [`Kernel::tick`] plays the
//! role of one SysTick interrupt.

mod kernel;
mod mailbox;
mod periodic;
mod ring;
mod sem;
mod stack;

#[cfg(all(feature = "cortex-m", target_arch = "arm"))]
mod hw;

pub use kernel::Kernel;
pub use mailbox::Mailbox;
pub use sem::{BlockingSemaphore, Semaphore};

#[cfg(all(feature = "cortex-m", target_arch = "arm"))]
pub use hw::*;

pub use ringos_core::{
    EntryPoint, OsConfig, OsConfigBuilder, OsError, OsResult, PeriodicCallback, ThreadBody,
    ThreadId, Tick, TimeSlice, N_MAX_THREADS, STACK_WORDS, VERSION,
};
pub use ringos_port::{Port, RegisterFile, SavedContext};
