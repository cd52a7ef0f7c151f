//! The kernel instance on Cortex-M hardware and its free-function API.

use ringos_core::{OsResult, PeriodicCallback, ThreadBody};
use ringos_port::armv7m::CortexMPort;

use crate::Kernel;

/// The one kernel on the target. The SysTick trap switches through it.
pub static KERNEL: Kernel<CortexMPort> = Kernel::new(CortexMPort::new());

// Called from the SysTick trap with interrupts masked.
#[no_mangle]
extern "C" fn ringos_switch_context(stack_pointer: usize) -> usize {
    KERNEL.switch_stack_pointer(stack_pointer)
}

// Called from the PendSV trap with interrupts masked.
#[no_mangle]
extern "C" fn ringos_yield_context(stack_pointer: usize) -> usize {
    KERNEL.yield_stack_pointer(stack_pointer)
}

/// Masks interrupts and runs `clock_init` to bring the core clock up.
pub fn init(clock_init: fn()) -> OsResult<()> {
    KERNEL.port().set_clock_init(clock_init);
    KERNEL.init()
}

pub fn add_threads(first: ThreadBody, second: ThreadBody) -> OsResult<()> {
    KERNEL.add_threads(first.into(), second.into())
}

pub fn add_periodic_event_thread(callback: PeriodicCallback, period: u32) -> OsResult<()> {
    KERNEL.add_periodic_event_thread(callback, period)
}

/// Starts SysTick with `cycles` per slice and runs the first thread.
pub fn launch(cycles: u32) -> ! {
    KERNEL.launch(cycles)
}
