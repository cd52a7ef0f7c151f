#![no_std]
#![no_main]

//! Sound level monitor for the TM4C123 LaunchPad
//!
//! A periodic callback samples the microphone once per tick and posts each
//! sample to a mailbox. One thread folds samples into mean and RMS figures
//! over a window; a second thread publishes each finished window for
//! display. Samples the processing thread misses show up in the mailbox's
//! loss counter.

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use panic_halt as _;

use ringos::{Mailbox, Semaphore};

/// Reset clock: the 16 MHz precision internal oscillator
const CORE_CLOCK_HZ: u32 = 16_000_000;
/// Scheduler and sampling rate
const TICK_HZ: u32 = 1_000;
/// Samples per window
const WINDOW: u32 = 1_024;

#[derive(Debug, Clone, Copy, Default)]
struct SoundStats {
    mean: u32,
    rms: u32,
}

static SAMPLES: Mailbox<u16> = Mailbox::new(0);
static STATS: Mailbox<SoundStats> = Mailbox::new(SoundStats { mean: 0, rms: 0 });
static DISPLAY: Semaphore = Semaphore::new(1);

// Published figures, read with a debugger
static SHOWN_MEAN: AtomicU32 = AtomicU32::new(0);
static SHOWN_RMS: AtomicU32 = AtomicU32::new(0);
static SHOWN_LOST: AtomicU32 = AtomicU32::new(0);
static FRAMES: AtomicU32 = AtomicU32::new(0);

static PHASE: AtomicU32 = AtomicU32::new(0);

/// Stand-in for the microphone ADC: a 12-bit triangle wave around mid-scale
fn read_microphone() -> u16 {
    let phase = PHASE.fetch_add(64, Ordering::Relaxed) % 4096;
    let level = if phase < 2048 { phase } else { 4095 - phase };
    (1024 + level) as u16
}

fn sample() {
    SAMPLES.send(read_microphone());
}

/// Integer square root by Newton iteration
fn isqrt(s: u64) -> u32 {
    if s == 0 {
        return 0;
    }
    let mut t = s / 16 + 1;
    for _ in 0..32 {
        t = (t + s / t) / 2;
    }
    t as u32
}

fn process() -> ! {
    loop {
        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        for _ in 0..WINDOW {
            let value = u64::from(SAMPLES.recv());
            sum += value;
            sum_sq += value * value;
        }
        let mean = sum / u64::from(WINDOW);
        let variance = sum_sq / u64::from(WINDOW) - mean * mean;
        STATS.send(SoundStats {
            mean: mean as u32,
            rms: isqrt(variance),
        });
    }
}

fn display() -> ! {
    loop {
        let stats = STATS.recv();

        DISPLAY.wait();
        SHOWN_MEAN.store(stats.mean, Ordering::Relaxed);
        SHOWN_RMS.store(stats.rms, Ordering::Relaxed);
        SHOWN_LOST.store(SAMPLES.lost(), Ordering::Relaxed);
        FRAMES.fetch_add(1, Ordering::Relaxed);
        DISPLAY.signal();
    }
}

fn clock_init() {
    // stays on the reset oscillator; CORE_CLOCK_HZ must follow any change here
}

#[entry]
fn main() -> ! {
    ringos::init(clock_init).unwrap();
    ringos::add_threads(process, display).unwrap();
    ringos::add_periodic_event_thread(sample, 1).unwrap();
    ringos::launch(CORE_CLOCK_HZ / TICK_HZ)
}
