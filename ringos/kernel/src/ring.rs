//! Thread control blocks linked into a circular run order.

use heapless::Vec;

use ringos_core::{EntryPoint, OsError, OsResult, ThreadId};
use ringos_port::SavedContext;

/// Thread control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tcb {
    /// Where the thread's frame sits while it is not running
    pub(crate) context: SavedContext,
    /// Ring successor
    pub(crate) next: usize,
    pub(crate) entry: EntryPoint,
    /// Address of the semaphore the thread is parked on
    pub(crate) blocked_on: Option<usize>,
}

impl Tcb {
    pub(crate) const fn new(entry: EntryPoint, context: SavedContext) -> Self {
        Self {
            context,
            next: 0,
            entry,
            blocked_on: None,
        }
    }
}

/// Fixed-capacity ring with a run pointer.
///
/// Slots are appended once and linked in registration order; the last slot
/// wraps to the first. The run pointer always names a valid slot once the
/// ring is non-empty.
#[derive(Debug)]
pub(crate) struct ThreadRing<const N: usize> {
    tcbs: Vec<Tcb, N>,
    run: usize,
}

impl<const N: usize> ThreadRing<N> {
    pub(crate) const fn new() -> Self {
        Self {
            tcbs: Vec::new(),
            run: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tcbs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tcbs.is_empty()
    }

    pub(crate) fn push(&mut self, tcb: Tcb) -> OsResult<ThreadId> {
        let id = ThreadId(self.tcbs.len() as u8);
        self.tcbs.push(tcb).map_err(|_| OsError::TooManyThreads {
            requested: N + 1,
            capacity: N,
        })?;
        Ok(id)
    }

    /// Closes the ring and points the run pointer at the first slot
    pub(crate) fn link(&mut self) {
        let len = self.tcbs.len();
        for (index, tcb) in self.tcbs.iter_mut().enumerate() {
            tcb.next = (index + 1) % len;
        }
        self.run = 0;
    }

    pub(crate) fn current(&self) -> Option<ThreadId> {
        if self.tcbs.is_empty() {
            None
        } else {
            Some(ThreadId(self.run as u8))
        }
    }

    pub(crate) fn get(&self, id: ThreadId) -> Option<&Tcb> {
        self.tcbs.get(id.index())
    }

    pub(crate) fn current_context(&self) -> Option<SavedContext> {
        self.tcbs.get(self.run).map(|tcb| tcb.context)
    }

    pub(crate) fn save_current(&mut self, context: SavedContext) {
        if let Some(tcb) = self.tcbs.get_mut(self.run) {
            tcb.context = context;
        }
    }

    /// Advances the run pointer to the next runnable successor.
    ///
    /// Blocked slots are skipped. When every slot is blocked the pointer
    /// still moves one step so the ring keeps turning.
    pub(crate) fn rotate(&mut self) -> Option<ThreadId> {
        let start = self.tcbs.get(self.run)?.next;
        let mut candidate = start;
        for _ in 0..self.tcbs.len() {
            let tcb = &self.tcbs[candidate];
            if tcb.blocked_on.is_none() {
                self.run = candidate;
                return Some(ThreadId(candidate as u8));
            }
            candidate = tcb.next;
        }
        self.run = start;
        Some(ThreadId(start as u8))
    }

    /// Parks the running thread on `key`
    pub(crate) fn block_current(&mut self, key: usize) -> Option<ThreadId> {
        let tcb = self.tcbs.get_mut(self.run)?;
        tcb.blocked_on = Some(key);
        Some(ThreadId(self.run as u8))
    }

    /// Releases the first thread parked on `key`, searching in run order
    /// starting after the running thread.
    pub(crate) fn unblock_first(&mut self, key: usize) -> Option<ThreadId> {
        let mut candidate = self.tcbs.get(self.run)?.next;
        for _ in 0..self.tcbs.len() {
            let tcb = &mut self.tcbs[candidate];
            if tcb.blocked_on == Some(key) {
                tcb.blocked_on = None;
                return Some(ThreadId(candidate as u8));
            }
            candidate = tcb.next;
        }
        None
    }

    pub(crate) fn is_blocked(&self, id: ThreadId) -> bool {
        self.get(id).is_some_and(|tcb| tcb.blocked_on.is_some())
    }
}
