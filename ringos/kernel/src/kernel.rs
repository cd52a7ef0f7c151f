//! The kernel object: thread registration, launch and the scheduler tick.

use core::cell::RefCell;

use critical_section::{CriticalSection, Mutex};
use log::{debug, error, info, trace, warn};

use ringos_core::{
    EntryPoint, OsConfig, OsError, OsResult, PeriodicCallback, ThreadId, Tick, TimeSlice,
    N_MAX_THREADS, STACK_WORDS,
};
use ringos_port::{build_initial_frame, restore_frame, Port, RegisterFile, SavedContext, FRAME_WORDS};

use crate::periodic::PeriodicSlot;
use crate::ring::{Tcb, ThreadRing};
use crate::stack::StackPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reset,
    Initialized,
    Launched,
}

/// What a switch does besides saving and restoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    /// A scheduler tick: periodic callback, tick count, rotation
    Tick,
    /// Rotation only
    Yield,
}

struct KernelState<const N: usize> {
    phase: Phase,
    ring: ThreadRing<N>,
    periodic: PeriodicSlot,
    ticks: Tick,
}

impl<const N: usize> KernelState<N> {
    const fn new() -> Self {
        Self {
            phase: Phase::Reset,
            ring: ThreadRing::new(),
            periodic: PeriodicSlot::new(),
            ticks: Tick::ZERO,
        }
    }

    fn require_initialized(&self) -> OsResult<()> {
        match self.phase {
            Phase::Reset => Err(OsError::NotInitialized),
            Phase::Initialized => Ok(()),
            Phase::Launched => Err(OsError::AlreadyLaunched),
        }
    }
}

/// Round-robin kernel over `N` statically allocated threads with stacks of
/// `W` words each.
///
/// All bookkeeping sits behind a critical-section mutex, so a `Kernel` can be
/// a `static` shared between threads and the tick interrupt.
///
/// ```ignore
/// static KERNEL: Kernel<CortexMPort> = Kernel::new(CortexMPort::new());
///
/// KERNEL.init()?;
/// KERNEL.add_threads(producer.into(), consumer.into())?;
/// KERNEL.add_periodic_event_thread(sample, 1)?;
/// KERNEL.launch(16_000);
/// ```
pub struct Kernel<P: Port, const N: usize = N_MAX_THREADS, const W: usize = STACK_WORDS> {
    port: P,
    config: OsConfig,
    state: Mutex<RefCell<KernelState<N>>>,
    stacks: StackPool<N, W>,
}

impl<P: Port, const N: usize, const W: usize> Kernel<P, N, W> {
    pub const fn new(port: P) -> Self {
        Self::with_config(port, OsConfig::DEFAULT)
    }

    pub const fn with_config(port: P, config: OsConfig) -> Self {
        assert!(N > 0 && N <= u8::MAX as usize, "ring capacity must be 1..=255");
        Self {
            port,
            config,
            state: Mutex::new(RefCell::new(KernelState::new())),
            stacks: StackPool::new(),
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn config(&self) -> &OsConfig {
        &self.config
    }

    /// Masks interrupts and brings up the core clock.
    ///
    /// Interrupts stay masked until the first thread starts. Calling `init`
    /// again before launch is harmless.
    pub fn init(&self) -> OsResult<()> {
        let launched = critical_section::with(|cs| {
            self.state.borrow_ref(cs).phase == Phase::Launched
        });
        if launched {
            warn!("{}: init after launch ignored", self.config.name);
            return Err(OsError::AlreadyLaunched);
        }

        self.port.disable_interrupts();
        self.port.init_clock();

        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).phase = Phase::Initialized;
        });
        debug!("{}: initialized", self.config.name);
        Ok(())
    }

    /// Installs the classic two-thread ring: `first` runs first and hands
    /// over to `second` on the next tick.
    pub fn add_threads(&self, first: EntryPoint, second: EntryPoint) -> OsResult<()> {
        self.add_thread_set(&[first, second])
    }

    /// Installs up to `N` threads, linked in the order given.
    ///
    /// Each thread gets the stack slot matching its position and an initial
    /// frame that resumes at its entry point. Registration is all or
    /// nothing, and it happens at most once.
    pub fn add_thread_set(&self, entries: &[EntryPoint]) -> OsResult<()> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.require_initialized()?;
            if !state.ring.is_empty() {
                return Err(OsError::ThreadsAlreadyAdded);
            }
            if entries.is_empty() {
                return Err(OsError::NoThreads);
            }
            if entries.len() > N {
                return Err(OsError::TooManyThreads {
                    requested: entries.len(),
                    capacity: N,
                });
            }
            if SavedContext::initial(W).is_none() {
                return Err(OsError::StackTooSmall {
                    words: W,
                    required: FRAME_WORDS,
                });
            }

            for (index, entry) in entries.iter().enumerate() {
                // SAFETY: nothing has launched, so no thread executes on this
                // stack, and the critical section excludes other writers.
                let stack = unsafe { self.stacks.stack_mut(index) };
                let context = build_initial_frame(stack, *entry)?;
                state.ring.push(Tcb::new(*entry, context))?;
                trace!("T{} entry {} frame at word {}", index, entry, context.offset());
            }
            state.ring.link();
            Ok(())
        })
        .inspect(|_| debug!("{}: {} threads linked", self.config.name, entries.len()))
        .inspect_err(|err| warn!("{}: thread registration rejected: {}", self.config.name, err))
    }

    /// Arranges for `callback` to run from the tick handler every `period`
    /// ticks, before the rotation of that tick.
    ///
    /// A later registration replaces the earlier one. The callback runs in
    /// interrupt context and must not spin on a semaphore.
    pub fn add_periodic_event_thread(&self, callback: PeriodicCallback, period: u32) -> OsResult<()> {
        if period == 0 {
            warn!("{}: periodic callback with zero period rejected", self.config.name);
            return Err(OsError::InvalidPeriod);
        }
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).periodic.install(callback, period);
        });
        debug!("{}: periodic callback every {} ticks", self.config.name, period);
        Ok(())
    }

    /// Validates the ring, programs the tick timer and marks the kernel
    /// launched.
    ///
    /// Returns the stack pointer of the first thread's frame; handing it to
    /// the port's `start_first_thread` completes the launch.
    pub fn prepare_launch(&self, slice: TimeSlice) -> OsResult<usize> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.require_initialized()?;
            let first = state.ring.current().ok_or(OsError::NoThreads)?;
            let context = state.ring.current_context().ok_or(OsError::NoThreads)?;

            self.port
                .configure_tick(slice, self.config.tick_priority_raw());
            state.phase = Phase::Launched;

            Ok(self.stacks.address_of(first.index(), context))
        })
    }

    /// Starts the tick timer with a period of `cycles` core clock cycles and
    /// transfers control to the first thread. Never returns.
    ///
    /// # Panics
    ///
    /// When the kernel is not ready to launch or the slice does not fit the
    /// timer. There is nothing to return to at that point.
    pub fn launch(&'static self, cycles: u32) -> ! {
        let prepared = TimeSlice::new(cycles).and_then(|slice| self.prepare_launch(slice));
        match prepared {
            Ok(stack_pointer) => {
                info!(
                    "{}: launching {} threads, slice {} cycles",
                    self.config.name,
                    self.thread_count(),
                    cycles
                );
                // SAFETY: the pointer addresses a frame built by
                // `add_thread_set` in a stack owned by this 'static kernel.
                unsafe { self.port.start_first_thread(stack_pointer) }
            }
            Err(err) => {
                error!("{}: launch rejected: {}", self.config.name, err);
                panic!("launch rejected: {}", err);
            }
        }
    }

    /// One scheduler tick.
    ///
    /// Runs the periodic callback when it is due, then advances the run
    /// pointer to the next runnable thread and returns it. Returns `None`
    /// until the kernel has launched.
    pub fn tick(&self) -> Option<ThreadId> {
        let due = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.phase != Phase::Launched {
                return None;
            }
            state.ticks.increment();
            Some(state.periodic.advance())
        })?;

        // Called outside the borrow so the callback may use semaphores and
        // mailboxes.
        if let Some(callback) = due {
            callback();
        }

        let next = critical_section::with(|cs| self.state.borrow_ref_mut(cs).ring.rotate());
        if let Some(next) = next {
            trace!("tick -> {}", next);
        }
        next
    }

    /// Stores `saved` for the running thread, ticks, and returns the context
    /// to restore.
    ///
    /// Before launch there is nothing to switch and `saved` comes back
    /// unchanged.
    pub fn switch_context(&self, saved: SavedContext) -> SavedContext {
        self.switch(saved, Advance::Tick).map_or(saved, |(_, next)| next)
    }

    /// Like [`switch_context`](Self::switch_context), but only rotates: the
    /// tick counter and the periodic callback do not move. This is the path
    /// a thread takes when it parks itself and yields.
    pub fn yield_context(&self, saved: SavedContext) -> SavedContext {
        self.switch(saved, Advance::Yield).map_or(saved, |(_, next)| next)
    }

    /// [`switch_context`](Self::switch_context) in terms of stack-pointer
    /// values, as seen by the tick trap.
    ///
    /// # Panics
    ///
    /// When the pointer does not address a whole frame in the running
    /// thread's stack. The stack has overflowed, and the neighbouring stack
    /// may already be corrupt.
    pub fn switch_stack_pointer(&self, stack_pointer: usize) -> usize {
        self.switch_at(stack_pointer, Advance::Tick)
    }

    /// [`yield_context`](Self::yield_context) in terms of stack-pointer
    /// values, as seen by the yield trap.
    ///
    /// # Panics
    ///
    /// On stack overflow, as [`switch_stack_pointer`](Self::switch_stack_pointer).
    pub fn yield_stack_pointer(&self, stack_pointer: usize) -> usize {
        self.switch_at(stack_pointer, Advance::Yield)
    }

    fn switch_at(&self, stack_pointer: usize, advance: Advance) -> usize {
        let Some(current) = self.current_thread() else {
            return stack_pointer;
        };
        let saved = match self.stacks.context_at(current.index(), stack_pointer) {
            Ok(saved) => saved,
            Err(err) => {
                error!("{}: {} stack pointer {:#x}: {}", self.config.name, current, stack_pointer, err);
                panic!("{} stack overflow", current);
            }
        };
        match self.switch(saved, advance) {
            Some((next, context)) => self.stacks.address_of(next.index(), context),
            None => stack_pointer,
        }
    }

    fn switch(&self, saved: SavedContext, advance: Advance) -> Option<(ThreadId, SavedContext)> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.phase != Phase::Launched {
                return None;
            }
            state.ring.save_current(saved);
            Some(())
        })?;

        match advance {
            Advance::Tick => {
                self.tick();
            }
            Advance::Yield => {
                let next = critical_section::with(|cs| self.state.borrow_ref_mut(cs).ring.rotate());
                if let Some(next) = next {
                    trace!("yield -> {}", next);
                }
            }
        }

        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            Some((state.ring.current()?, state.ring.current_context()?))
        })
    }

    /// Thread the run pointer names
    pub fn current_thread(&self) -> Option<ThreadId> {
        critical_section::with(|cs| self.state.borrow_ref(cs).ring.current())
    }

    pub fn thread_count(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).ring.len())
    }

    /// Ticks counted since launch
    pub fn tick_count(&self) -> Tick {
        critical_section::with(|cs| self.state.borrow_ref(cs).ticks)
    }

    pub fn is_launched(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).phase == Phase::Launched)
    }

    pub fn has_periodic_event(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).periodic.is_armed())
    }

    pub fn entry_of(&self, id: ThreadId) -> Option<EntryPoint> {
        critical_section::with(|cs| self.state.borrow_ref(cs).ring.get(id).map(|tcb| tcb.entry))
    }

    pub fn saved_context(&self, id: ThreadId) -> Option<SavedContext> {
        critical_section::with(|cs| self.state.borrow_ref(cs).ring.get(id).map(|tcb| tcb.context))
    }

    pub fn is_blocked(&self, id: ThreadId) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).ring.is_blocked(id))
    }

    /// Registers a suspended thread would resume with.
    ///
    /// The running thread's frame is live once launched and cannot be read;
    /// asking for it is an error.
    pub fn registers_of(&self, id: ThreadId) -> OsResult<RegisterFile> {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            let tcb = state.ring.get(id).ok_or(OsError::InvalidContext)?;
            if state.phase == Phase::Launched && state.ring.current() == Some(id) {
                return Err(OsError::InvalidContext);
            }
            // SAFETY: the thread is suspended and the critical section keeps
            // it that way while we read.
            let stack = unsafe { self.stacks.stack(id.index()) };
            restore_frame(stack, tcb.context)
        })
    }

    /// Parks the running thread on `key`. Returns the parked thread.
    pub(crate) fn block_current(&self, cs: CriticalSection<'_>, key: usize) -> Option<ThreadId> {
        let mut state = self.state.borrow_ref_mut(cs);
        if state.phase != Phase::Launched {
            return None;
        }
        state.ring.block_current(key)
    }

    pub(crate) fn is_launched_in(&self, cs: CriticalSection<'_>) -> bool {
        self.state.borrow_ref(cs).phase == Phase::Launched
    }

    pub(crate) fn unblock_first(&self, cs: CriticalSection<'_>, key: usize) -> Option<ThreadId> {
        self.state.borrow_ref_mut(cs).ring.unblock_first(key)
    }

    /// Yields the processor until `id` is released
    pub(crate) fn suspend(&self, id: ThreadId) {
        self.port.request_switch();
        while self.is_blocked(id) {
            core::hint::spin_loop();
        }
    }
}
