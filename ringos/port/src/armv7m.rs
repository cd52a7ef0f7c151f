//! ARMv7-M port.
//!
//! Threads run on the main stack in thread mode. Switches happen in two
//! exceptions sharing one priority: SysTick (a scheduler tick) and PendSV (a
//! yield from a thread that parked itself). Each handler pushes R4-R11 on
//! top of the frame the hardware already stacked, hands the resulting stack
//! pointer to the kernel, and unwinds whichever frame the kernel hands back.
//!
//! Only the integer context is switched. Build for `thumbv7em-none-eabi`
//! (or `thumbv7m-none-eabi`); on a hard-float target a thread that touches
//! the FPU gets a 26-word exception frame and an EXC_RETURN this port does
//! not track, and S16-S31 are not saved.

use core::arch::{asm, global_asm};
use core::cell::Cell;

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{Peripherals, SCB};
use critical_section::Mutex;
use ringos_core::TimeSlice;

use crate::Port;

// SysTick trap. `ringos_switch_context` takes the preempted thread's stack
// pointer (pointing at its R4 slot) and returns the next thread's. LR holds
// EXC_RETURN for thread mode on the main stack without FP state and is
// shared by all threads; it is parked on the old stack across the call and
// popped before SP moves.
global_asm!(
    ".section .text.SysTick,\"ax\",%progbits",
    ".global SysTick",
    ".type SysTick,%function",
    ".thumb_func",
    "SysTick:",
    "    cpsid   i",
    "    push    {{r4-r11}}",
    "    mov     r0, sp",
    "    push    {{r0, lr}}",
    "    bl      ringos_switch_context",
    "    pop     {{r1, lr}}",
    "    mov     sp, r0",
    "    pop     {{r4-r11}}",
    "    cpsie   i",
    "    bx      lr",
    ".size SysTick, . - SysTick",
);

// PendSV trap, same frame handling as SysTick. `ringos_yield_context`
// rotates the ring without counting a tick.
global_asm!(
    ".section .text.PendSV,\"ax\",%progbits",
    ".global PendSV",
    ".type PendSV,%function",
    ".thumb_func",
    "PendSV:",
    "    cpsid   i",
    "    push    {{r4-r11}}",
    "    mov     r0, sp",
    "    push    {{r0, lr}}",
    "    bl      ringos_yield_context",
    "    pop     {{r1, lr}}",
    "    mov     sp, r0",
    "    pop     {{r4-r11}}",
    "    cpsie   i",
    "    bx      lr",
    ".size PendSV, . - PendSV",
);

/// Port for Cortex-M3/M4 parts
pub struct CortexMPort {
    clock_init: Mutex<Cell<Option<fn()>>>,
}

impl CortexMPort {
    pub const fn new() -> Self {
        Self {
            clock_init: Mutex::new(Cell::new(None)),
        }
    }

    /// Installs the board routine that brings the PLL up; `init_clock`
    /// runs it.
    pub fn set_clock_init(&self, init: fn()) {
        critical_section::with(|cs| self.clock_init.borrow(cs).set(Some(init)));
    }
}

impl Default for CortexMPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for CortexMPort {
    fn disable_interrupts(&self) {
        cortex_m::interrupt::disable();
    }

    fn init_clock(&self) {
        let init = critical_section::with(|cs| self.clock_init.borrow(cs).get());
        match init {
            Some(init) => init(),
            None => log::warn!("no clock init installed, running on reset clock"),
        }
    }

    fn configure_tick(&self, slice: TimeSlice, priority: u8) {
        // SAFETY: launch runs once with interrupts masked; nothing else owns
        // SYST or the SysTick priority at this point.
        let mut p = unsafe { Peripherals::steal() };

        p.SYST.disable_counter();
        p.SYST.clear_current();
        // SAFETY: raising or lowering the SysTick priority cannot break a
        // priority-based critical section because none is in use.
        // PendSV shares the level so a yield and a tick never nest.
        unsafe {
            p.SCB.set_priority(SystemHandler::SysTick, priority);
            p.SCB.set_priority(SystemHandler::PendSV, priority);
        }
        p.SYST.set_reload(slice.reload());
        p.SYST.set_clock_source(SystClkSource::Core);
        p.SYST.enable_interrupt();
        p.SYST.enable_counter();
    }

    fn request_switch(&self) {
        SCB::set_pendsv();
    }

    unsafe fn start_first_thread(&self, stack_pointer: usize) -> ! {
        // Unwind the initial frame by hand: R4-R11, R0-R3, R12, skip the
        // saved LR, take PC as the return address, skip xPSR. The stacked PC
        // has the Thumb bit clear; `bx` needs it set.
        asm!(
            "mov     sp, {sp}",
            "pop     {{r4-r11}}",
            "pop     {{r0-r3}}",
            "pop     {{r12}}",
            "add     sp, sp, #4",
            "pop     {{lr}}",
            "add     sp, sp, #4",
            "orr     lr, lr, #1",
            "cpsie   i",
            "bx      lr",
            sp = in(reg) stack_pointer,
            options(noreturn),
        )
    }
}
